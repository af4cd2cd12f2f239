// 数据库模块
// 连接管理、实体定义、仓储与基于数据库的访问控制存储

pub mod cli;
pub mod connection;
pub mod entities;
pub mod migrations;
pub mod repositories;
pub mod store;


pub use connection::*;
pub use migrations::*;
pub use repositories::*;
pub use store::DatabaseConfigStore;
