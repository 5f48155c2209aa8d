/*
 * Responsibility
 * - ドメインロジック (HTTP に依存しない)
 * - auth: bearer token 検証, idp: 登録ハンドシェイク, session: ブラウザセッション
 */
pub mod auth;
pub mod idp;
pub mod session;
