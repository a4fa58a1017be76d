//! 位置存储 - 每个配送员一个 latest-wins 槽位
//!
//! - 只保留最新样本，旧样本直接丢弃（不是轨迹日志）
//! - 乱序到达的旧样本返回 [`RecordOutcome::Stale`]，不算错误
//! - 每个配送员一个槽位，并发写同一配送员只在时间戳比较上竞争
//!   （DashMap entry 即 per-key 临界区，没有全局锁）

mod store;

pub use store::{LocationStore, RecordOutcome};
