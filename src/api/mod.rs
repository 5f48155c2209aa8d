/*
 * Responsibility
 * - HTTP 層の公開ポイント (routes() の re-export など)
 * - handler / extractor / dto / view (HTML テンプレート)
 */
pub mod dto;
pub mod extractors;
pub mod handlers;
mod routes;
pub mod views;

pub use routes::routes;
