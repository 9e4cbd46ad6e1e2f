/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use aws_credential_types::Credentials;
use aws_role_chain::chain::{assume_role_sequence, RoleHop};
use aws_role_chain::retry::{RetryPolicy, MAX_BACKOFF};
use aws_role_chain::sts::{
    AssumeRoleClient, AssumeRoleRequest, ClientFactory, ClientSettings, SdkClientFactory,
};
use aws_smithy_async::test_util::{instant_time_and_sleep, InstantSleep};
use aws_smithy_http_client::test_util::{ReplayEvent, StaticReplayClient};
use aws_smithy_types::body::SdkBody;
use aws_types::region::Region;
use std::time::{Duration, UNIX_EPOCH};

const ROLE_ARN: &str = "arn:aws:iam::222222222222:role/target";

fn assume_role_response(access_key_id: &str) -> String {
    format!(
        "<AssumeRoleResponse xmlns=\"https://sts.amazonaws.com/doc/2011-06-15/\">\n  <AssumeRoleResult>\n    <AssumedRoleUser>\n      <AssumedRoleId>AROAR42TAWARILN3MNKUT:session</AssumedRoleId>\n      <Arn>arn:aws:sts::222222222222:assumed-role/target/session</Arn>\n    </AssumedRoleUser>\n    <Credentials>\n      <AccessKeyId>{access_key_id}</AccessKeyId>\n      <SecretAccessKey>secret-{access_key_id}</SecretAccessKey>\n      <SessionToken>token-{access_key_id}</SessionToken>\n      <Expiration>2009-02-13T23:31:30Z</Expiration>\n    </Credentials>\n  </AssumeRoleResult>\n  <ResponseMetadata>\n    <RequestId>d9d47248-fd55-4686-ad7c-0fb7cd1cddd7</RequestId>\n  </ResponseMetadata>\n</AssumeRoleResponse>\n"
    )
}

fn error_response(code: &str) -> String {
    format!(
        "<ErrorResponse xmlns=\"https://sts.amazonaws.com/doc/2011-06-15/\">\n  <Error>\n    <Type>Sender</Type>\n    <Code>{code}</Code>\n    <Message>rejected by test</Message>\n  </Error>\n  <RequestId>c2e971c2-702d-4124-9b1f-1670febbea18</RequestId>\n</ErrorResponse>\n"
    )
}

fn event(status: u16, body: String) -> ReplayEvent {
    ReplayEvent::new(
        http_1x::Request::new(SdkBody::from("request body")),
        http_1x::Response::builder()
            .status(status)
            .body(SdkBody::from(body))
            .unwrap(),
    )
}

fn denied(status: u16) -> ReplayEvent {
    event(status, error_response("AccessDenied"))
}

fn factory(http_client: &StaticReplayClient) -> (SdkClientFactory, InstantSleep) {
    // two minutes before the expiration of the replayed credentials
    let (time_source, sleep) =
        instant_time_and_sleep(UNIX_EPOCH + Duration::from_secs(1234567890 - 120));
    let factory = SdkClientFactory::new()
        .http_client(http_client.clone())
        .sleep_impl(sleep.clone())
        .time_source(time_source);
    (factory, sleep)
}

fn settings(retry_policy: RetryPolicy) -> ClientSettings {
    ClientSettings::new(Region::from_static("us-east-1")).retry_policy(retry_policy)
}

fn seed_credentials() -> Credentials {
    Credentials::new("AKIDSEED", "seed-secret", None, None, "test")
}

#[tokio::test]
async fn trust_propagation_errors_are_retried_five_times() {
    for status in [401, 403, 404] {
        let http_client = StaticReplayClient::new((0..5).map(|_| denied(status)).collect());
        let (factory, sleep) = factory(&http_client);
        let client = factory
            .build_client(
                &seed_credentials(),
                &settings(RetryPolicy::eventual_consistency()),
            )
            .unwrap();

        client
            .assume_role(AssumeRoleRequest::new(ROLE_ARN, "session"))
            .await
            .expect_err("every attempt is denied");

        assert_eq!(http_client.actual_requests().count(), 5, "status {status}");
        assert!(sleep.logs().iter().all(|backoff| *backoff <= MAX_BACKOFF));
    }
}

async fn attempts_until_failure(retry_policy: RetryPolicy, status: u16, code: &str) -> usize {
    let http_client =
        StaticReplayClient::new((0..5).map(|_| event(status, error_response(code))).collect());
    let (factory, sleep) = factory(&http_client);
    let client = factory
        .build_client(&seed_credentials(), &settings(retry_policy))
        .unwrap();

    client
        .assume_role(AssumeRoleRequest::new(ROLE_ARN, "session"))
        .await
        .expect_err("every attempt fails");

    assert!(sleep.logs().iter().all(|backoff| *backoff <= MAX_BACKOFF));
    http_client.actual_requests().count()
}

#[tokio::test]
async fn transient_and_throttling_errors_are_retried_five_times() {
    for (status, code) in [
        (500, "InternalFailure"),
        (503, "ServiceUnavailable"),
        (400, "Throttling"),
        (429, "ThrottlingException"),
    ] {
        let attempts =
            attempts_until_failure(RetryPolicy::eventual_consistency(), status, code).await;
        assert_eq!(attempts, 5, "{status} {code}");
    }
}

#[tokio::test]
async fn standard_policy_retries_transient_errors_three_times() {
    for (status, code) in [(503, "ServiceUnavailable"), (400, "Throttling")] {
        let attempts = attempts_until_failure(RetryPolicy::standard(), status, code).await;
        assert_eq!(attempts, 3, "{status} {code}");
    }
}

#[tokio::test]
async fn conflicts_are_not_retried() {
    let attempts =
        attempts_until_failure(RetryPolicy::eventual_consistency(), 409, "Conflict").await;
    assert_eq!(attempts, 1);
}

#[tokio::test]
async fn succeeds_once_the_trust_policy_propagated() {
    let http_client = StaticReplayClient::new(vec![
        denied(403),
        denied(404),
        event(200, assume_role_response("ASIAPROPAGATED")),
    ]);
    let (factory, _sleep) = factory(&http_client);
    let client = factory
        .build_client(
            &seed_credentials(),
            &settings(RetryPolicy::eventual_consistency()),
        )
        .unwrap();

    let credentials = client
        .assume_role(AssumeRoleRequest::new(ROLE_ARN, "session"))
        .await
        .expect("third attempt succeeds");
    assert_eq!(credentials.access_key_id(), "ASIAPROPAGATED");
    assert_eq!(credentials.session_token(), Some("token-ASIAPROPAGATED"));
    assert_eq!(
        credentials.expiry(),
        Some(UNIX_EPOCH + Duration::from_secs(1234567890))
    );
    assert_eq!(http_client.actual_requests().count(), 3);
}

#[tokio::test]
async fn bad_request_fails_after_one_attempt() {
    let http_client = StaticReplayClient::new(vec![event(400, error_response("ValidationError"))]);
    let (factory, _sleep) = factory(&http_client);
    let client = factory
        .build_client(
            &seed_credentials(),
            &settings(RetryPolicy::eventual_consistency()),
        )
        .unwrap();

    client
        .assume_role(AssumeRoleRequest::new(ROLE_ARN, "session"))
        .await
        .expect_err("bad request");
    assert_eq!(http_client.actual_requests().count(), 1);
}

#[tokio::test]
async fn standard_policy_does_not_retry_access_denied() {
    let http_client = StaticReplayClient::new(vec![denied(403)]);
    let (factory, _sleep) = factory(&http_client);
    let client = factory
        .build_client(&seed_credentials(), &settings(RetryPolicy::standard()))
        .unwrap();

    client
        .assume_role(AssumeRoleRequest::new(ROLE_ARN, "session"))
        .await
        .expect_err("denied");
    assert_eq!(http_client.actual_requests().count(), 1);
}

#[tokio::test]
async fn each_hop_signs_with_the_previous_hop_credentials() {
    let http_client = StaticReplayClient::new(vec![
        event(200, assume_role_response("ASIAHOPONE")),
        event(200, assume_role_response("ASIAHOPTWO")),
    ]);
    let (factory, _sleep) = factory(&http_client);
    let seed = factory
        .build_client(&seed_credentials(), &settings(RetryPolicy::standard()))
        .unwrap();
    let hops = vec![
        RoleHop::new("arn:aws:iam::111111111111:role/support", "u@x.com"),
        RoleHop::new(ROLE_ARN, "u@x.com"),
    ];

    let credentials = assume_role_sequence(seed, &hops, None, &factory)
        .await
        .expect("both hops succeed");
    assert_eq!(credentials.access_key_id(), "ASIAHOPTWO");

    let authorizations: Vec<String> = http_client
        .actual_requests()
        .map(|request| {
            request
                .headers()
                .get("authorization")
                .expect("signed")
                .to_string()
        })
        .collect();
    assert_eq!(authorizations.len(), 2);
    assert!(
        authorizations[0].contains("Credential=AKIDSEED/"),
        "{}",
        authorizations[0]
    );
    assert!(
        authorizations[1].contains("Credential=ASIAHOPONE/"),
        "{}",
        authorizations[1]
    );
}
