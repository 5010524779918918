//! Confirm port - 同期的な yes/no ゲート
//!
//! 破壊的な操作（ジョブ削除など）の前に呼ばれます。

pub trait Confirm: Send + Sync {
    fn confirm(&self, prompt: &str) -> bool;
}

impl<F> Confirm for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn confirm(&self, prompt: &str) -> bool {
        self(prompt)
    }
}
