/*
 * Responsibility
 * - social IdP 登録トランザクション (fetch → profile 入力 → provision)
 * - リモート IdP 管理 API の client は trait 越しに差し替え可能にする
 */
pub mod client;
pub mod coordinator;
pub mod types;

pub use client::{HttpIdpClient, IdpError};
pub use coordinator::{IdpTransactionCoordinator, SubmitOutcome, TransactionError};
pub use types::ProvisionProfile;
