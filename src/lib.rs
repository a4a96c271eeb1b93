//! 认证服务库
//! 注册、登录、无状态令牌与按请求的认证闸门

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod repository;
pub mod routes;
pub mod services;
pub mod telemetry;
