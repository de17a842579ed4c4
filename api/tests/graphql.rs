mod common;

use std::sync::Arc;

use api::auth::{AuthConfig, CurrentUser, UserRole};
use api::schema::{build_schema, seed_workflow_demo, AppSchema};
use async_graphql::{Request, ServerError, Value as GqlValue, Variables};
use serde_json::{json, Value};
use uuid::Uuid;

type TestSchema = async_graphql::Schema<
    api::schema::QueryRoot,
    api::schema::MutationRoot,
    async_graphql::EmptySubscription,
>;

struct GraphqlEnv {
    schema: TestSchema,
    member: Uuid,
    approver_a: Uuid,
    approver_b: Uuid,
}

fn auth_config() -> AuthConfig {
    AuthConfig {
        jwt_secret: "graphql-test-secret".into(),
        local_auth_enabled: true,
        session_ttl_minutes: 30,
    }
}

async fn setup() -> GraphqlEnv {
    let db = Arc::new(common::sqlite_db().await);
    let member = common::insert_user(&db, "member@club.test", "Morgan Member", &["MEMBER"]).await;
    let approver_a =
        common::insert_user(&db, "first@club.test", "Avery First", &["APPROVER"]).await;
    let approver_b =
        common::insert_user(&db, "second@club.test", "Blake Second", &["APPROVER"]).await;
    let AppSchema(schema) = build_schema(db.clone(), Arc::new(auth_config()));
    GraphqlEnv {
        schema,
        member,
        approver_a,
        approver_b,
    }
}

fn as_user(user_id: Uuid, roles: &[UserRole]) -> CurrentUser {
    CurrentUser {
        user_id,
        roles: roles.to_vec(),
    }
}

async fn exec_as(
    schema: &TestSchema,
    user: CurrentUser,
    query: &str,
    vars: Value,
) -> async_graphql::Response {
    schema
        .execute(
            Request::new(query)
                .variables(Variables::from_json(vars))
                .data(user),
        )
        .await
}

async fn exec_anon(schema: &TestSchema, query: &str, vars: Value) -> async_graphql::Response {
    schema
        .execute(Request::new(query).variables(Variables::from_json(vars)))
        .await
}

fn has_error_code(errors: &[ServerError], code: &str) -> bool {
    errors.iter().any(|e| {
        matches!(
            e.extensions.as_ref().and_then(|ext| ext.get("code")),
            Some(GqlValue::String(s)) if s == code
        )
    })
}

const SUBMIT: &str = r#"
    mutation Submit($input: SubmitDocumentInput!) {
        workflow { submitDocument(input: $input) { id status createdBy } }
    }
"#;

const DECIDE: &str = r#"
    mutation Decide($input: ApproverDecisionInput!) {
        workflow { recordApproverDecision(input: $input) { id status } }
    }
"#;

const VIEW: &str = r#"
    query View($id: ID!) {
        workflow {
            document(id: $id) {
                document { id status }
                approvers { id userId status position }
                signers { id name status }
                events { kind message }
            }
        }
    }
"#;

fn submit_vars(env: &GraphqlEnv) -> Value {
    json!({
        "input": {
            "title": "Venue Hire Agreement",
            "description": "Hall rental for the annual gala",
            "fileUrl": "http://localhost:8080/files/venue.pdf",
            "approverIds": [env.approver_a, env.approver_b],
            "signers": [
                { "name": "Dana Auditor", "designation": "External Auditor" }
            ]
        }
    })
}

#[tokio::test]
async fn submit_approve_and_sign_via_graphql() {
    let env = setup().await;

    let resp = exec_as(
        &env.schema,
        as_user(env.member, &[UserRole::Member]),
        SUBMIT,
        submit_vars(&env),
    )
    .await;
    assert!(resp.errors.is_empty(), "unexpected errors: {:?}", resp.errors);
    let data = resp.data.into_json().unwrap();
    let doc = &data["workflow"]["submitDocument"];
    assert_eq!(doc["status"], "PENDING_APPROVAL");
    let doc_id = doc["id"].as_str().unwrap().to_string();

    let resp = exec_as(
        &env.schema,
        as_user(env.member, &[UserRole::Member]),
        VIEW,
        json!({ "id": doc_id }),
    )
    .await;
    assert!(resp.errors.is_empty());
    let view = resp.data.into_json().unwrap()["workflow"]["document"].clone();
    let approvers = view["approvers"].as_array().unwrap().clone();
    assert_eq!(approvers.len(), 2);
    assert_eq!(view["events"].as_array().unwrap().len(), 1);
    assert_eq!(view["events"][0]["kind"], "created");

    // Each assigned approver approves through the API.
    for user_id in [env.approver_a, env.approver_b] {
        let row = approvers
            .iter()
            .find(|a| a["userId"] == json!(user_id.to_string()))
            .unwrap();
        let resp = exec_as(
            &env.schema,
            as_user(user_id, &[UserRole::Approver]),
            DECIDE,
            json!({
                "input": {
                    "documentId": doc_id,
                    "approverId": row["id"],
                    "decision": "APPROVED"
                }
            }),
        )
        .await;
        assert!(resp.errors.is_empty(), "unexpected errors: {:?}", resp.errors);
    }

    let resp = exec_as(
        &env.schema,
        as_user(env.member, &[UserRole::Member]),
        VIEW,
        json!({ "id": doc_id }),
    )
    .await;
    let view = resp.data.into_json().unwrap()["workflow"]["document"].clone();
    assert_eq!(view["document"]["status"], "IN_PROGRESS");
    let signer_id = view["signers"][0]["id"].as_str().unwrap().to_string();

    let sign = r#"
        mutation Sign($input: SignerOutcomeInput!) {
            workflow { recordSignerOutcome(input: $input) { id status } }
        }
    "#;
    let resp = exec_as(
        &env.schema,
        as_user(env.member, &[UserRole::Member]),
        sign,
        json!({
            "input": {
                "documentId": doc_id,
                "signerId": signer_id,
                "outcome": "SIGNED"
            }
        }),
    )
    .await;
    assert!(resp.errors.is_empty(), "unexpected errors: {:?}", resp.errors);
    assert_eq!(
        resp.data.into_json().unwrap()["workflow"]["recordSignerOutcome"]["status"],
        "COMPLETED"
    );
}

#[tokio::test]
async fn unauthenticated_requests_are_rejected() {
    let env = setup().await;
    let resp = exec_anon(&env.schema, SUBMIT, submit_vars(&env)).await;
    assert!(has_error_code(&resp.errors, "UNAUTHENTICATED"));
}

#[tokio::test]
async fn decision_by_wrong_user_is_forbidden() {
    let env = setup().await;
    let resp = exec_as(
        &env.schema,
        as_user(env.member, &[UserRole::Member]),
        SUBMIT,
        submit_vars(&env),
    )
    .await;
    let doc_id = resp.data.into_json().unwrap()["workflow"]["submitDocument"]["id"]
        .as_str()
        .unwrap()
        .to_string();

    let resp = exec_as(
        &env.schema,
        as_user(env.member, &[UserRole::Member]),
        VIEW,
        json!({ "id": doc_id }),
    )
    .await;
    let approver_row_id = resp.data.into_json().unwrap()["workflow"]["document"]["approvers"][0]
        ["id"]
        .as_str()
        .unwrap()
        .to_string();

    // The submitting member is not the assigned approver.
    let resp = exec_as(
        &env.schema,
        as_user(env.member, &[UserRole::Member]),
        DECIDE,
        json!({
            "input": {
                "documentId": doc_id,
                "approverId": approver_row_id,
                "decision": "APPROVED"
            }
        }),
    )
    .await;
    assert!(has_error_code(&resp.errors, "FORBIDDEN"));
}

#[tokio::test]
async fn repeated_decision_surfaces_conflict_code() {
    let env = setup().await;
    let resp = exec_as(
        &env.schema,
        as_user(env.member, &[UserRole::Member]),
        SUBMIT,
        submit_vars(&env),
    )
    .await;
    let doc_id = resp.data.into_json().unwrap()["workflow"]["submitDocument"]["id"]
        .as_str()
        .unwrap()
        .to_string();
    let resp = exec_as(
        &env.schema,
        as_user(env.member, &[UserRole::Member]),
        VIEW,
        json!({ "id": doc_id }),
    )
    .await;
    let approvers = resp.data.into_json().unwrap()["workflow"]["document"]["approvers"]
        .as_array()
        .unwrap()
        .clone();
    let row = approvers
        .iter()
        .find(|a| a["userId"] == json!(env.approver_a.to_string()))
        .unwrap();
    let vars = json!({
        "input": {
            "documentId": doc_id,
            "approverId": row["id"],
            "decision": "APPROVED"
        }
    });
    let actor = as_user(env.approver_a, &[UserRole::Approver]);
    let resp = exec_as(&env.schema, actor.clone(), DECIDE, vars.clone()).await;
    assert!(resp.errors.is_empty());
    let resp = exec_as(&env.schema, actor, DECIDE, vars).await;
    assert!(has_error_code(&resp.errors, "CONFLICT"));
}

#[tokio::test]
async fn validation_errors_carry_code() {
    let env = setup().await;
    let resp = exec_as(
        &env.schema,
        as_user(env.member, &[UserRole::Member]),
        SUBMIT,
        json!({
            "input": {
                "title": "No approvers",
                "fileUrl": "http://localhost:8080/files/x.pdf",
                "approverIds": [],
                "signers": [{ "name": "Dana", "designation": "Auditor" }]
            }
        }),
    )
    .await;
    assert!(has_error_code(&resp.errors, "VALIDATION"));
}

#[tokio::test]
async fn missing_document_resolves_to_null() {
    let env = setup().await;
    let resp = exec_as(
        &env.schema,
        as_user(env.member, &[UserRole::Member]),
        VIEW,
        json!({ "id": Uuid::new_v4() }),
    )
    .await;
    assert!(resp.errors.is_empty());
    assert!(resp.data.into_json().unwrap()["workflow"]["document"].is_null());
}

#[tokio::test]
async fn documents_list_limit_enforced() {
    let env = setup().await;
    let query = r#"
        query Docs($first: Int!) {
            workflow { documents(first: $first) { id } }
        }
    "#;
    let resp = exec_as(
        &env.schema,
        as_user(env.member, &[UserRole::Member]),
        query,
        json!({ "first": 101 }),
    )
    .await;
    assert!(has_error_code(&resp.errors, "LIMIT_EXCEEDED"));
}

#[tokio::test]
async fn delete_document_respects_ownership() {
    let env = setup().await;
    let resp = exec_as(
        &env.schema,
        as_user(env.member, &[UserRole::Member]),
        SUBMIT,
        submit_vars(&env),
    )
    .await;
    let doc_id = resp.data.into_json().unwrap()["workflow"]["submitDocument"]["id"]
        .as_str()
        .unwrap()
        .to_string();

    let delete = r#"
        mutation Delete($id: ID!) { workflow { deleteDocument(id: $id) } }
    "#;
    let resp = exec_as(
        &env.schema,
        as_user(env.approver_a, &[UserRole::Approver]),
        delete,
        json!({ "id": doc_id }),
    )
    .await;
    assert!(has_error_code(&resp.errors, "FORBIDDEN"));

    let resp = exec_as(
        &env.schema,
        as_user(env.member, &[UserRole::Member]),
        delete,
        json!({ "id": doc_id }),
    )
    .await;
    assert!(resp.errors.is_empty());
    assert!(resp.data.into_json().unwrap()["workflow"]["deleteDocument"]
        .as_bool()
        .unwrap());
}

#[tokio::test]
async fn login_issues_session_and_me_resolves() {
    let db = Arc::new(common::sqlite_db().await);
    let seeded = seed_workflow_demo(db.as_ref()).await.unwrap();
    let AppSchema(schema) = build_schema(db.clone(), Arc::new(auth_config()));

    let login = r#"
        mutation Login($email: String!, $password: String!) {
            workflow {
                login(email: $email, password: $password) {
                    ok token error user { email roles }
                }
            }
        }
    "#;
    let resp = exec_anon(
        &schema,
        login,
        json!({ "email": "treasurer@club.test", "password": "treasurerpass" }),
    )
    .await;
    assert!(resp.errors.is_empty(), "unexpected errors: {:?}", resp.errors);
    let payload = resp.data.into_json().unwrap()["workflow"]["login"].clone();
    assert_eq!(payload["ok"], true);
    assert!(payload["token"].is_string());
    assert_eq!(payload["user"]["email"], "treasurer@club.test");

    let resp = exec_anon(
        &schema,
        login,
        json!({ "email": "treasurer@club.test", "password": "wrong" }),
    )
    .await;
    assert!(resp.errors.is_empty());
    let payload = resp.data.into_json().unwrap()["workflow"]["login"].clone();
    assert_eq!(payload["ok"], false);
    assert!(payload["error"].is_string());

    let treasurer = seeded.user_email("treasurer@club.test").unwrap();
    let me = r#"
        query { workflow { me { user { email } roles } } }
    "#;
    let resp = exec_as(
        &schema,
        as_user(treasurer.id, &[UserRole::Approver]),
        me,
        json!({}),
    )
    .await;
    assert!(resp.errors.is_empty());
    let data = resp.data.into_json().unwrap();
    assert_eq!(data["workflow"]["me"]["user"]["email"], "treasurer@club.test");
    assert!(data["workflow"]["me"]["roles"]
        .as_array()
        .unwrap()
        .contains(&json!("APPROVER")));
}

#[tokio::test]
async fn seed_creates_demo_document_in_approval() {
    let db = Arc::new(common::sqlite_db().await);
    let seeded = seed_workflow_demo(db.as_ref()).await.unwrap();
    let budget = seeded.document_titled("Annual Budget 2026").unwrap();
    assert_eq!(budget.status, entity::document::Status::PendingApproval);
    assert!(seeded.user_email("chair@club.test").is_some());
}
