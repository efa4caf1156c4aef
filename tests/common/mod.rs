#![allow(dead_code, unused_imports)]

pub use stageflow_test_utils::builders;
pub use stageflow_test_utils::fake_service;
pub use stageflow_test_utils::{capture, init_tracing, resolve_now, try_resolve_now, with_timeout};
