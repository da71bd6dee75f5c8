//! 网络模块
//!
//! HTTP 客户端构建、代理、超时/取消与可选重试

mod client;
mod proxy;
mod retry;
mod timeout;

pub use client::*;
pub use proxy::*;
pub use retry::*;
pub use timeout::*;
