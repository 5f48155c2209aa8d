/*
 * Responsibility
 * - middleware の公開インターフェース
 * - auth (bearer 検証), session (sid cookie), http / cors / security_headers (横断的関心事)
 */
pub mod auth;
pub mod cors;
pub mod http;
pub mod security_headers;
pub mod session;
