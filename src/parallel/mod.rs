//! Generic parallel execution framework
//!
//! Resource discovery and execution strategy only: worker counts come from
//! the host core count and the `checkout` configuration, and callers decide
//! what a work item is. Workers communicate over bounded crossbeam channels
//! inside a thread scope, so processors may borrow from the caller.
//!
//! ```rust
//! use depsync::parallel::ExecutionStrategy;
//!
//! let workers = ExecutionStrategy::calculate_optimal_workers(0, 75);
//! let strategy = ExecutionStrategy::for_workers(workers);
//! let doubled = strategy
//!     .execute(vec![1, 2, 3], |x, _worker_id| x * 2, None::<fn(usize, usize, usize)>)
//!     .unwrap();
//! assert_eq!(doubled, vec![2, 4, 6]);
//! ```

pub mod core;

pub use self::core::{ExecutionStrategy, ParallelExecutor, SequentialExecutor};
