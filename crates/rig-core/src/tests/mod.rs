//! Behavioural suites for workload lifecycle orchestration.

mod support;
