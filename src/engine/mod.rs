pub mod dispatch;
pub mod gateway;
pub mod ledger;
pub mod pool;
pub mod queue;
