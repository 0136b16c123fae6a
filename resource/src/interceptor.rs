//! The resource interceptor.
//!
//! Turns intents into REQUEST actions, performs REQUESTs as stream effects
//! and settles waiters when SUCCEED or FAIL passes by. Every action it sees
//! continues to the reducer; nothing is swallowed.

use crate::action::{ActionKind, ResourceAction};
use crate::environment::ResourceEnvironment;
use crate::error::{Rejection, RequestError};
use crate::extractor::collect_records;
use crate::request::{build_request, RequestOptions};
use crate::resource::Resource;
use crate::state::ResourceState;
use async_stream::stream;
use composable_resource_core::http::{HttpResponse, Method, TransportError};
use composable_resource_core::{Effect, Interception, Interceptor};
use composable_resource_runtime::metrics::RequestMetrics;
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;

/// Interceptor of one resource.
///
/// Actions addressed to other resources pass through untouched.
#[derive(Clone, Debug)]
pub struct ResourceInterceptor {
    resource: Resource,
}

impl ResourceInterceptor {
    /// Interceptor stamping derived actions with `resource`
    #[must_use]
    pub const fn new(resource: Resource) -> Self {
        Self { resource }
    }

    fn settle(state: &ResourceState, action: &ResourceAction) {
        let Some(id) = action.settles() else {
            return;
        };
        let Some(waiter) = state.waiter(id) else {
            return;
        };

        let settled = match &action.kind {
            ActionKind::Succeed { response, .. } => waiter.completion.resolve(response.clone()),
            ActionKind::Fail { response, error, .. } => waiter.completion.reject(Rejection {
                response: response.clone(),
                error: error.clone(),
            }),
            _ => return,
        };

        if settled {
            tracing::debug!(correlation_id = %id, outcome = %action.action_type(), "Settled waiter");
        } else {
            tracing::trace!(correlation_id = %id, "Waiter already settled or abandoned");
        }
    }

    fn update(&self, state: &ResourceState, action: &ResourceAction) -> Interception<ResourceAction> {
        let ActionKind::Update { target, data, .. } = &action.kind else {
            return Interception::pass(action.clone());
        };

        let mut spec = data.clone();
        spec.insert("id".to_string(), target.to_value());
        let url = self.resource.config().single_uri(&spec);

        let request = self.resource.request(
            action.clone(),
            &RequestOptions::new()
                .with_method(Method::Patch)
                .with_data(Value::Object(data.clone())),
            Some(url),
        );
        let mut interception = Interception::pass(action.clone()).dispatching(request);

        if self.resource.config().optimistic() {
            let attributes = state.item(target).map_or_else(|| data.clone(), |current| current.merged(data));
            tracing::trace!(resource = %self.resource.name(), id = %target, "Optimistic receive");
            interception = interception.dispatching(self.resource.receive(target.clone(), attributes));
        }

        interception
    }

    fn perform(&self, request: &ResourceAction, env: &ResourceEnvironment) -> Effect<ResourceAction> {
        let ActionKind::Request { trigger, url, options, .. } = &request.kind else {
            return Effect::None;
        };

        let resource = self.resource.clone();
        let transport = Arc::clone(&env.transport);
        let trigger = trigger.as_ref().clone();
        let built = build_request(url, options);

        Effect::stream(stream! {
            let name = resource.name();
            match built {
                Err(error) => {
                    tracing::warn!(resource = %name, action = %trigger, error = %error, "Could not build request");
                    RequestMetrics::record_failure(name, error.kind());
                    yield resource.fail(trigger, None, error);
                },
                Ok(outgoing) => {
                    let method = outgoing.method.as_str();
                    tracing::debug!(resource = %name, method, url = %outgoing.url, action = %trigger, "Sending request");
                    RequestMetrics::record_request(name, method);

                    let started = Instant::now();
                    let result = transport.send(outgoing).await;

                    for outcome in conclude(&resource, trigger, result, started) {
                        yield outcome;
                    }
                },
            }
        })
    }
}

/// Map one transport result to SUCCEED + RECEIVE_MANY, or FAIL
fn conclude(
    resource: &Resource,
    trigger: ResourceAction,
    result: Result<HttpResponse, TransportError>,
    started: Instant,
) -> Vec<ResourceAction> {
    let name = resource.name();

    let response = match result {
        Ok(response) => response,
        Err(error) => {
            let error = RequestError::from(error);
            tracing::warn!(resource = %name, action = %trigger, error = %error, "Request failed without a response");
            RequestMetrics::record_failure(name, error.kind());
            return vec![resource.fail(trigger, None, error)];
        },
    };

    RequestMetrics::record_response(name, response.status, started.elapsed());

    if !response.is_success() {
        let body = if response.is_empty() {
            None
        } else {
            response.json::<Value>().ok()
        };
        let error = RequestError::Http {
            status: response.status,
            status_text: response.status_text.clone(),
        };
        tracing::warn!(resource = %name, action = %trigger, status = response.status, "Request rejected");
        RequestMetrics::record_failure(name, error.kind());
        return vec![resource.fail(trigger, body, error)];
    }

    let config = resource.config();
    match config.response_handler().handle(&response) {
        Ok(parsed) => {
            let records = collect_records(config.extractor(), &parsed);
            tracing::debug!(
                resource = %name,
                action = %trigger,
                status = response.status,
                received = records.len(),
                "Request succeeded"
            );
            vec![resource.succeed(trigger, parsed), resource.receive_many(records)]
        },
        Err(error) => {
            tracing::warn!(resource = %name, action = %trigger, error = %error, "Could not handle response");
            RequestMetrics::record_failure(name, error.kind());
            vec![resource.fail(trigger, None, error)]
        },
    }
}

impl Interceptor for ResourceInterceptor {
    type State = ResourceState;
    type Action = ResourceAction;
    type Environment = ResourceEnvironment;

    fn intercept(
        &self,
        state: &ResourceState,
        action: ResourceAction,
        env: &ResourceEnvironment,
    ) -> Interception<ResourceAction> {
        if !action.is_for(self.resource.name()) {
            return Interception::pass(action);
        }

        match &action.kind {
            ActionKind::Await { action: inner, .. } => {
                let inner = inner.as_ref().clone();
                Interception::pass(action).dispatching(inner)
            },
            ActionKind::Succeed { .. } | ActionKind::Fail { .. } => {
                Self::settle(state, &action);
                Interception::pass(action)
            },
            ActionKind::Update { .. } => self.update(state, &action),
            ActionKind::Create { data, .. } => {
                let options = RequestOptions::new().with_method(Method::Post).with_data(data.clone());
                let request = self.resource.request(action.clone(), &options, None);
                Interception::pass(action).dispatching(request)
            },
            ActionKind::Query { params, .. } => {
                let options = RequestOptions::new().with_method(Method::Get).with_query(params.clone());
                let request = self.resource.request(action.clone(), &options, None);
                Interception::pass(action).dispatching(request)
            },
            ActionKind::Get { params, .. } => {
                let url = self.resource.config().single_uri(params);
                let options = RequestOptions::new().with_method(Method::Get);
                let request = self.resource.request(action.clone(), &options, Some(url));
                Interception::pass(action).dispatching(request)
            },
            ActionKind::Request { .. } => {
                let effect = self.perform(&action, env);
                Interception::pass(action).with_effect(effect)
            },
            ActionKind::Receive { .. } | ActionKind::ReceiveMany { .. } => Interception::pass(action),
        }
    }
}
