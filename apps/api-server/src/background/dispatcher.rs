//! Notification dispatcher.
//!
//! Subscribes to the domain event channels and fans events out as queued
//! jobs: one push job per stored Web Push subscription for post approvals,
//! and email jobs for account events. Everything here is fire-and-forget;
//! a dead letter never propagates back to the request that triggered it.
//! The push and email transports themselves are external collaborators,
//! so the worker's terminal step is handing the payload off.

use std::sync::Arc;

use quill_core::domain::{ACCOUNTS_CHANNEL, DomainEvent, POSTS_CHANNEL};
use quill_core::ports::{Job, JobQueue, JobResult, PushSubscriptionRepository};

use crate::state::AppState;

/// Wire up the event subscriptions and start the job worker.
pub async fn start(state: &AppState) {
    start_worker(state.jobs.clone()).await;

    subscribe_post_events(state).await;
    subscribe_account_events(state).await;

    tracing::info!("Notification dispatcher started");
}

async fn subscribe_post_events(state: &AppState) {
    let jobs = state.jobs.clone();
    let push_subscriptions = state.push_subscriptions.clone();

    let result = state
        .events
        .subscribe(
            POSTS_CHANNEL,
            Box::new(move |msg| {
                let jobs = jobs.clone();
                let push_subscriptions = push_subscriptions.clone();
                Box::pin(async move {
                    match serde_json::from_str::<DomainEvent>(&msg.payload) {
                        Ok(event) => handle_post_event(event, &*jobs, &*push_subscriptions).await,
                        Err(e) => {
                            tracing::warn!(error = %e, "Undecodable post event, dropping")
                        }
                    }
                })
            }),
        )
        .await;

    if let Err(e) = result {
        tracing::error!(error = %e, "Failed to subscribe to post events");
    }
}

async fn subscribe_account_events(state: &AppState) {
    let jobs = state.jobs.clone();

    let result = state
        .events
        .subscribe(
            ACCOUNTS_CHANNEL,
            Box::new(move |msg| {
                let jobs = jobs.clone();
                Box::pin(async move {
                    match serde_json::from_str::<DomainEvent>(&msg.payload) {
                        Ok(event) => handle_account_event(event, &*jobs).await,
                        Err(e) => {
                            tracing::warn!(error = %e, "Undecodable account event, dropping")
                        }
                    }
                })
            }),
        )
        .await;

    if let Err(e) = result {
        tracing::error!(error = %e, "Failed to subscribe to account events");
    }
}

async fn handle_post_event(
    event: DomainEvent,
    jobs: &dyn JobQueue,
    push_subscriptions: &dyn PushSubscriptionRepository,
) {
    match event {
        DomainEvent::PostApproved { post_id, slug, title } => {
            let subscriptions = match push_subscriptions.list_all().await {
                Ok(subs) => subs,
                Err(e) => {
                    tracing::error!(error = %e, "Could not load push subscriptions");
                    return;
                }
            };

            tracing::info!(
                post_id = %post_id,
                recipients = subscriptions.len(),
                "Fanning out post approval notifications"
            );

            for sub in subscriptions {
                let job = Job::new(
                    "push.post_approved",
                    serde_json::json!({
                        "endpoint": sub.endpoint,
                        "p256dh": sub.p256dh,
                        "auth": sub.auth,
                        "slug": &slug,
                        "title": &title,
                    }),
                );
                enqueue(jobs, job).await;
            }
        }
        DomainEvent::PostSubmitted { post_id, slug, .. } => {
            let job = Job::new(
                "email.moderation_queue",
                serde_json::json!({ "post_id": post_id, "slug": slug }),
            );
            enqueue(jobs, job).await;
        }
        DomainEvent::PostRejected { post_id, .. } => {
            tracing::debug!(post_id = %post_id, "Post rejected, no outbound notification");
        }
        other => {
            tracing::debug!(?other, "Ignoring event on post channel");
        }
    }
}

async fn handle_account_event(event: DomainEvent, jobs: &dyn JobQueue) {
    let job = match event {
        DomainEvent::AccountRegistered {
            email,
            verification_token,
            ..
        } => Job::new(
            "email.verify_address",
            serde_json::json!({ "email": email, "token": verification_token }),
        ),
        DomainEvent::PasswordResetRequested {
            email, reset_token, ..
        } => Job::new(
            "email.password_reset",
            serde_json::json!({ "email": email, "token": reset_token }),
        ),
        DomainEvent::SubscriberJoined { email } => Job::new(
            "email.newsletter_welcome",
            serde_json::json!({ "email": email }),
        ),
        other => {
            tracing::debug!(?other, "Ignoring event on account channel");
            return;
        }
    };

    enqueue(jobs, job).await;
}

async fn enqueue(jobs: &dyn JobQueue, job: Job) {
    if let Err(e) = jobs.enqueue(job).await {
        tracing::error!(error = %e, "Failed to enqueue notification job");
    }
}

/// The worker's terminal step: hand the payload to the external transport.
/// With delivery out of process, success here means "accepted for delivery".
async fn start_worker(jobs: Arc<dyn JobQueue>) {
    let result = jobs
        .start_worker(Box::new(|job| {
            Box::pin(async move {
                match job.job_type.split_once('.') {
                    Some(("push", kind)) => {
                        tracing::info!(
                            job_id = %job.id,
                            kind = kind,
                            "Push notification handed off"
                        );
                        JobResult::Success
                    }
                    Some(("email", kind)) => {
                        tracing::info!(
                            job_id = %job.id,
                            kind = kind,
                            "Email handed off"
                        );
                        JobResult::Success
                    }
                    _ => JobResult::Failed(format!("unknown job type '{}'", job.job_type)),
                }
            })
        }))
        .await;

    if let Err(e) = result {
        tracing::error!(error = %e, "Failed to start notification worker");
    }
}
