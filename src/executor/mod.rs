// ABOUTME: Async worker pool — component I of the streaming SDK
// ABOUTME: Backs the async middleware chain and any other fire-and-query background work
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

mod pool;

pub use pool::{Pool, TaskRecord, WorkerStats};
