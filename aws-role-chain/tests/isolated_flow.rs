/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use aws_role_chain::chain::AssumptionSequence;
use aws_role_chain::config::ChainConfig;
use aws_role_chain::isolated::{IsolatedCredentials, IsolatedCredentialsError};
use aws_role_chain::isolation::{cluster_lookup_fn, is_isolated, ClusterAttributes};
use aws_role_chain::BoxError;
use aws_smithy_async::test_util::instant_time_and_sleep;
use aws_smithy_http_client::test_util::{ReplayEvent, StaticReplayClient};
use aws_smithy_types::body::SdkBody;
use aws_types::os_shim_internal::Env;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use std::time::{Duration, UNIX_EPOCH};

const INITIAL_ROLE: &str = "arn:aws:iam::000000000000:role/backplane-initial";

fn credentials_xml(access_key_id: &str) -> String {
    format!(
        "<Credentials>\n      <AccessKeyId>{access_key_id}</AccessKeyId>\n      <SecretAccessKey>secret-{access_key_id}</SecretAccessKey>\n      <SessionToken>token-{access_key_id}</SessionToken>\n      <Expiration>2009-02-13T23:31:30Z</Expiration>\n    </Credentials>"
    )
}

fn web_identity_response(access_key_id: &str) -> String {
    format!(
        "<AssumeRoleWithWebIdentityResponse xmlns=\"https://sts.amazonaws.com/doc/2011-06-15/\">\n  <AssumeRoleWithWebIdentityResult>\n    {}\n  </AssumeRoleWithWebIdentityResult>\n  <ResponseMetadata>\n    <RequestId>ad4156e9-bce1-11e2-82e6-6b6efEXAMPLE</RequestId>\n  </ResponseMetadata>\n</AssumeRoleWithWebIdentityResponse>\n",
        credentials_xml(access_key_id)
    )
}

fn assume_role_response(access_key_id: &str) -> String {
    format!(
        "<AssumeRoleResponse xmlns=\"https://sts.amazonaws.com/doc/2011-06-15/\">\n  <AssumeRoleResult>\n    {}\n  </AssumeRoleResult>\n  <ResponseMetadata>\n    <RequestId>d9d47248-fd55-4686-ad7c-0fb7cd1cddd7</RequestId>\n  </ResponseMetadata>\n</AssumeRoleResponse>\n",
        credentials_xml(access_key_id)
    )
}

fn ok(body: String) -> ReplayEvent {
    ReplayEvent::new(
        http_1x::Request::new(SdkBody::from("request body")),
        http_1x::Response::builder()
            .status(200)
            .body(SdkBody::from(body))
            .unwrap(),
    )
}

fn jwt(claims: &str) -> String {
    format!(
        "{}.{}.{}",
        URL_SAFE_NO_PAD.encode(r#"{"alg":"RS256","typ":"JWT"}"#),
        URL_SAFE_NO_PAD.encode(claims),
        URL_SAFE_NO_PAD.encode("signature")
    )
}

fn config(http_client: &StaticReplayClient) -> ChainConfig {
    let (time_source, sleep) =
        instant_time_and_sleep(UNIX_EPOCH + Duration::from_secs(1234567890 - 120));
    ChainConfig::builder(INITIAL_ROLE)
        .env(Env::from_slice(&[("AWS_REGION", "eu-west-1")]))
        .http_client(http_client.clone())
        .sleep_impl(sleep)
        .time_source(time_source)
        .build()
}

fn sequence() -> AssumptionSequence {
    serde_json::from_str(
        r#"{
            "customerRoleSessionName": "customer-session",
            "assumptionSequence": [
                { "name": "SRE-Support-Role", "arn": "arn:aws:iam::111111111111:role/support" },
                { "name": "Target-Role-Arn", "arn": "arn:aws:iam::222222222222:role/target" }
            ]
        }"#,
    )
    .unwrap()
}

fn body(request: &aws_smithy_runtime_api::client::orchestrator::HttpRequest) -> String {
    String::from_utf8(request.body().bytes().expect("in-memory body").to_vec()).unwrap()
}

#[tokio::test]
async fn isolated_cluster_credentials_through_sts() {
    let lookup = cluster_lookup_fn(|_: String| async {
        Ok::<_, BoxError>("arn:aws:iam::123456789012:role/RH-Technical-Support-12345".to_string())
    });
    let cluster = ClusterAttributes::new("cluster-1", false, true);
    assert!(is_isolated(&cluster, &lookup).await.unwrap());

    let http_client = StaticReplayClient::new(vec![
        ok(web_identity_response("ASIASEED")),
        ok(assume_role_response("ASIASUPPORT")),
        ok(assume_role_response("ASIATARGET")),
    ]);
    let token = jwt(r#"{"email":"u@x.com"}"#);
    let trusted_ips = vec!["203.0.113.0/24".to_string()];

    let response = IsolatedCredentials::new(config(&http_client))
        .fetch(&token, sequence(), Some(trusted_ips.as_slice()))
        .await
        .expect("flow succeeds");

    assert_eq!(response.access_key_id(), "ASIATARGET");
    assert_eq!(response.secret_access_key(), "secret-ASIATARGET");
    assert_eq!(response.session_token(), "token-ASIATARGET");
    assert_eq!(response.region(), "eu-west-1");
    assert_eq!(response.expiration(), "2009-02-13T23:31:30Z");
    assert!(response
        .fmt_export()
        .contains("export AWS_ACCESS_KEY_ID=ASIATARGET"));

    let requests: Vec<_> = http_client.actual_requests().collect();
    assert_eq!(requests.len(), 3);

    let web_identity = body(requests[0]);
    assert!(web_identity.contains("Action=AssumeRoleWithWebIdentity"), "{web_identity}");
    assert!(web_identity.contains("RoleSessionName=u%40x.com"), "{web_identity}");
    assert!(requests[0].headers().get("authorization").is_none());

    let support = body(requests[1]);
    assert!(support.contains("Action=AssumeRole&"), "{support}");
    assert!(!support.contains("Policy="), "{support}");
    assert!(requests[1]
        .headers()
        .get("authorization")
        .unwrap()
        .contains("Credential=ASIASEED/"));

    let target = body(requests[2]);
    assert!(target.contains("RoleSessionName=customer-session"), "{target}");
    assert!(target.contains("Policy="), "{target}");
    assert!(requests[2]
        .headers()
        .get("authorization")
        .unwrap()
        .contains("Credential=ASIASUPPORT/"));
}

#[tokio::test]
async fn token_without_email_makes_no_request() {
    let http_client = StaticReplayClient::new(vec![]);
    let token = jwt(r#"{"sub":"1234"}"#);

    let err = IsolatedCredentials::new(config(&http_client))
        .fetch(&token, sequence(), None)
        .await
        .expect_err("no email");

    assert!(matches!(err, IsolatedCredentialsError::WebIdentity(_)));
    assert_eq!(http_client.actual_requests().count(), 0);
}
