//! Scripted cloud fakes
//!
//! `ScriptedStackLifecycle` replays queued responses and records every call.
//! `FakeBucketDirectory` serves a fixed bucket listing and per-bucket tags.

use async_trait::async_trait;
use locus_core::effects::{BucketDirectoryEffects, StackLifecycleEffects};
use locus_core::{BootstrapCredentials, DomainError, LocusResult, S3Error, StackDetails, StackEvent};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

/// Arguments of one `create_stack` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateStackCall {
    pub stack_name: String,
    pub template_body: String,
    pub parameters: HashMap<String, String>,
    pub region: String,
}

#[derive(Debug, Default)]
struct StackScript {
    create_result: Option<LocusResult<String>>,
    describe_queue: VecDeque<LocusResult<StackDetails>>,
    describe_fallback: Option<LocusResult<StackDetails>>,
    events_queue: VecDeque<LocusResult<Vec<StackEvent>>>,
    create_calls: Vec<CreateStackCall>,
    describe_calls: usize,
    events_calls: usize,
}

/// Stack lifecycle fake driven by queued responses.
///
/// `describe_stack` pops from its queue; once the queue is empty it repeats
/// the fallback (by default `CREATE_IN_PROGRESS`). `create_stack` returns an
/// ARN derived from the stack name unless a result was set.
#[derive(Debug, Clone, Default)]
pub struct ScriptedStackLifecycle {
    script: Arc<Mutex<StackScript>>,
}

impl ScriptedStackLifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_create_result(&self, result: LocusResult<String>) {
        self.script.lock().create_result = Some(result);
    }

    pub fn push_describe(&self, result: LocusResult<StackDetails>) {
        self.script.lock().describe_queue.push_back(result);
    }

    /// Response repeated once the describe queue runs dry.
    pub fn set_describe_fallback(&self, result: LocusResult<StackDetails>) {
        self.script.lock().describe_fallback = Some(result);
    }

    pub fn push_events(&self, result: LocusResult<Vec<StackEvent>>) {
        self.script.lock().events_queue.push_back(result);
    }

    pub fn create_calls(&self) -> Vec<CreateStackCall> {
        self.script.lock().create_calls.clone()
    }

    pub fn create_call_count(&self) -> usize {
        self.script.lock().create_calls.len()
    }

    pub fn describe_call_count(&self) -> usize {
        self.script.lock().describe_calls
    }

    pub fn events_call_count(&self) -> usize {
        self.script.lock().events_calls
    }
}

#[async_trait]
impl StackLifecycleEffects for ScriptedStackLifecycle {
    async fn create_stack(
        &self,
        creds: &BootstrapCredentials,
        stack_name: &str,
        template_body: &str,
        parameters: &HashMap<String, String>,
    ) -> LocusResult<String> {
        let mut script = self.script.lock();
        script.create_calls.push(CreateStackCall {
            stack_name: stack_name.to_string(),
            template_body: template_body.to_string(),
            parameters: parameters.clone(),
            region: creds.region.clone(),
        });
        tracing::debug!(stack_name, "scripted create_stack");
        script
            .create_result
            .clone()
            .unwrap_or_else(|| Ok(crate::fixtures::stack_arn(stack_name)))
    }

    async fn describe_stack(
        &self,
        _creds: &BootstrapCredentials,
        _stack_name: &str,
    ) -> LocusResult<StackDetails> {
        let mut script = self.script.lock();
        script.describe_calls += 1;
        match script.describe_queue.pop_front() {
            Some(result) => result,
            None => script
                .describe_fallback
                .clone()
                .unwrap_or_else(|| Ok(StackDetails::new("CREATE_IN_PROGRESS"))),
        }
    }

    async fn describe_stack_events(
        &self,
        _creds: &BootstrapCredentials,
        _stack_name: &str,
    ) -> LocusResult<Vec<StackEvent>> {
        let mut script = self.script.lock();
        script.events_calls += 1;
        script.events_queue.pop_front().unwrap_or_else(|| Ok(Vec::new()))
    }
}

#[derive(Debug, Default)]
struct BucketState {
    list_result: Option<LocusResult<Vec<String>>>,
    tags: HashMap<String, LocusResult<HashMap<String, String>>>,
    tag_calls: Vec<String>,
}

/// Bucket directory fake.
///
/// Buckets added with tags are listed in insertion order; tag lookups for
/// unknown buckets fail with `S3Error::BucketNotFound`.
#[derive(Debug, Clone, Default)]
pub struct FakeBucketDirectory {
    state: Arc<Mutex<BucketState>>,
    order: Arc<Mutex<Vec<String>>>,
}

impl FakeBucketDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_bucket(&self, name: &str, tags: &[(&str, &str)]) {
        let tags = tags
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        self.state.lock().tags.insert(name.to_string(), Ok(tags));
        self.order.lock().push(name.to_string());
    }

    /// Listed bucket whose tag lookup fails with `error`.
    pub fn add_unreadable_bucket(&self, name: &str, error: DomainError) {
        self.state.lock().tags.insert(name.to_string(), Err(error));
        self.order.lock().push(name.to_string());
    }

    pub fn fail_listing(&self, error: DomainError) {
        self.state.lock().list_result = Some(Err(error));
    }

    pub fn tag_calls(&self) -> Vec<String> {
        self.state.lock().tag_calls.clone()
    }
}

#[async_trait]
impl BucketDirectoryEffects for FakeBucketDirectory {
    async fn list_buckets(&self, _creds: &BootstrapCredentials) -> LocusResult<Vec<String>> {
        if let Some(result) = self.state.lock().list_result.clone() {
            return result;
        }
        Ok(self.order.lock().clone())
    }

    async fn get_bucket_tags(
        &self,
        _creds: &BootstrapCredentials,
        bucket_name: &str,
    ) -> LocusResult<HashMap<String, String>> {
        let mut state = self.state.lock();
        state.tag_calls.push(bucket_name.to_string());
        state.tags.get(bucket_name).cloned().unwrap_or_else(|| {
            Err(S3Error::BucketNotFound {
                bucket_name: bucket_name.to_string(),
            }
            .into())
        })
    }
}
