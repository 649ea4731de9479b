use finsight_client::{ApiError, HttpSchedulerApi, SchedulerApi};
use finsight_schema::{NewSchedule, ScheduleUpdate};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn schedule_json(id: &str, is_active: bool) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "name": "ETF nightly refresh",
        "workflowId": "wf-etf",
        "cronExpression": "0 2 * * *",
        "isActive": is_active,
        "lastRun": null,
        "nextRun": "2024-05-02T02:00:00.000Z"
    })
}

fn ack(success: bool) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(serde_json::json!({ "success": success }))
}

#[tokio::test]
async fn status_sends_bearer_and_parses_payload() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/scheduler/status"))
        .and(header("authorization", "Bearer console-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "isActive": true,
            "timestamp": "2024-05-01T09:00:00.000Z",
            "stats": {
                "totalJobs": 1,
                "runningJobs": 0,
                "errorCount": 2,
                "lastUpdate": "2024-05-01T09:00:00.000Z",
                "jobs": []
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let api = HttpSchedulerApi::builder(server.uri())
        .bearer_token("console-token")
        .build()
        .unwrap();
    let status = api.status().await.unwrap();

    assert!(status.is_active);
    assert_eq!(status.stats.unwrap().error_count, 2);
}

#[tokio::test]
async fn status_error_maps_to_status_variant() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/scheduler/status"))
        .respond_with(ResponseTemplate::new(503).set_body_string("warming up"))
        .mount(&server)
        .await;

    let api = HttpSchedulerApi::new(server.uri()).unwrap();
    let err = api.status().await.unwrap_err();

    assert!(err.is_retryable());
    match err {
        ApiError::Status { status, body } => {
            assert_eq!(status.as_u16(), 503);
            assert_eq!(body, "warming up");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn malformed_status_is_a_decode_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/scheduler/status"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>login</html>"))
        .mount(&server)
        .await;

    let api = HttpSchedulerApi::new(server.uri()).unwrap();
    assert!(matches!(api.status().await, Err(ApiError::Decode(_))));
}

#[tokio::test]
async fn start_and_stop_post_to_their_endpoints() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/scheduler/start"))
        .respond_with(ack(true))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/scheduler/stop"))
        .respond_with(ack(true))
        .expect(1)
        .mount(&server)
        .await;

    let api = HttpSchedulerApi::new(server.uri()).unwrap();
    api.start().await.unwrap();
    api.stop().await.unwrap();
}

#[tokio::test]
async fn unsuccessful_ack_is_rejected() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/scheduler/start"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "success": false,
            "message": "scheduler already starting"
        })))
        .mount(&server)
        .await;

    let api = HttpSchedulerApi::new(server.uri()).unwrap();
    let err = api.start().await.unwrap_err();

    assert!(matches!(
        err,
        ApiError::Rejected { message: Some(ref m) } if m == "scheduler already starting"
    ));
}

#[tokio::test]
async fn schedule_crud_round_trip() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/scheduler/workflows"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!([schedule_json("s-1", true)])),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/scheduler/workflows"))
        .and(body_json(serde_json::json!({
            "name": "ETF nightly refresh",
            "workflowId": "wf-etf",
            "cronExpression": "0 2 * * *",
            "isActive": true
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(schedule_json("s-2", true)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/api/scheduler/workflows/s-2"))
        .and(body_json(serde_json::json!({ "isActive": false })))
        .respond_with(ResponseTemplate::new(200).set_body_json(schedule_json("s-2", false)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/scheduler/workflows/s-2/run"))
        .respond_with(ack(true))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/scheduler/workflows/s-2"))
        .respond_with(ack(true))
        .expect(1)
        .mount(&server)
        .await;

    let api = HttpSchedulerApi::new(server.uri()).unwrap();

    let listed = api.list_schedules().await.unwrap();
    assert_eq!(listed.len(), 1);
    assert!(listed[0].last_run.is_none());

    let created = api
        .create_schedule(&NewSchedule {
            name: "ETF nightly refresh".into(),
            workflow_id: "wf-etf".into(),
            cron_expression: "0 2 * * *".into(),
            is_active: true,
        })
        .await
        .unwrap();
    assert_eq!(created.id, "s-2");

    let toggled = api
        .update_schedule("s-2", &ScheduleUpdate::toggle(false))
        .await
        .unwrap();
    assert!(!toggled.is_active);

    api.run_schedule("s-2").await.unwrap();
    api.delete_schedule("s-2").await.unwrap();
}

#[tokio::test]
async fn unreachable_server_is_retryable() {
    let api = HttpSchedulerApi::new("http://127.0.0.1:9").unwrap();
    let err = api.status().await.unwrap_err();
    assert!(matches!(err, ApiError::Connect(_) | ApiError::Transport(_)));
}
