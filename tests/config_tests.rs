//! 配置集成测试模块

mod config_tests {
    // 公共辅助函数
    pub mod common;
    // 测试模块
    #[cfg(test)]
    mod file;
    #[cfg(test)]
    mod validation;
}
