//! 管理 API 集成测试模块

mod api_v1_tests {
    // 导出helpers模块，使其可以被其他测试模块使用
    pub mod helpers;
    // 测试模块
    #[cfg(test)]
    mod auth;
    #[cfg(test)]
    mod cache;
    #[cfg(test)]
    mod stats;
}
