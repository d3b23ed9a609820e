// tests/api_tests.rs

use std::collections::HashMap;

use careermate::{
    config::{Config, ReportConfig, StoreBackend},
    models::user::NewUser,
    routes,
    state::AppState,
    utils::hash::hash_password,
};
use serde_json::{Value, json};

const ADMIN_USERNAME: &str = "admin";
const ADMIN_PASSWORD: &str = "admin_password";

struct TestApp {
    address: String,
    client: reqwest::Client,
}

/// Helper function to spawn the app on a random port for testing.
/// Runs on the in-memory stores with the report pipeline disabled.
async fn spawn_app() -> TestApp {
    // 1. Create test configuration
    let config = Config {
        database_url: String::new(),
        jwt_secret: "test_secret_for_integration_tests".to_string(),
        jwt_expiration: 600, // 10 minutes for tests
        rust_log: "error".to_string(),
        admin_username: None,
        admin_password: None,
        store_backend: StoreBackend::Memory,
        questions_per_subject: 5,
        report: ReportConfig::default(),
    };

    // 2. Create state and seed an admin and a learner
    let state = AppState::in_memory(config, None);
    state
        .users
        .create(NewUser {
            username: ADMIN_USERNAME.to_string(),
            email: None,
            password_hash: hash_password(ADMIN_PASSWORD).unwrap(),
            role: "admin".to_string(),
        })
        .await
        .unwrap();
    state
        .users
        .create(NewUser {
            username: "learner".to_string(),
            email: Some("learner@example.com".to_string()),
            password_hash: hash_password("learner_password").unwrap(),
            role: "user".to_string(),
        })
        .await
        .unwrap();

    // 3. Create the router with the app state
    let app = routes::create_router(state);

    // 4. Bind to port 0 to get a random available port
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");

    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    // 5. Spawn the server in the background
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestApp {
        address,
        client: reqwest::Client::new(),
    }
}

impl TestApp {
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    async fn login(&self, username: &str, password: &str) -> String {
        let resp: Value = self
            .client
            .post(self.url("/api/auth/login"))
            .json(&json!({ "username": username, "password": password }))
            .send()
            .await
            .expect("Login failed")
            .json()
            .await
            .expect("Failed to parse login json");

        resp["token"].as_str().expect("Token not found").to_string()
    }

    /// Seeds five questions per subject; the correct answer is always "A".
    async fn seed_questions(&self, token: &str) -> Vec<Value> {
        let mut created = Vec::new();
        for subject in ["physics", "chemistry", "maths", "biology", "logicalreasoning"] {
            for i in 0..5 {
                let resp = self
                    .client
                    .post(self.url("/api/admin/questions"))
                    .bearer_auth(token)
                    .json(&json!({
                        "subject": subject,
                        "question_text": format!("{} question {}", subject, i),
                        "options": ["A", "B", "C", "D"],
                        "correct_answer": "A"
                    }))
                    .send()
                    .await
                    .expect("Create question failed");
                assert_eq!(resp.status().as_u16(), 201);
                created.push(resp.json::<Value>().await.unwrap());
            }
        }
        created
    }

    async fn submit(&self, token: Option<&str>, body: Value) -> reqwest::Response {
        let mut req = self.client.post(self.url("/api/test/submit")).json(&body);
        if let Some(token) = token {
            req = req.bearer_auth(token);
        }
        req.send().await.expect("Submit failed")
    }
}

fn ids_for(questions: &[Value], subject: &str) -> Vec<i64> {
    questions
        .iter()
        .filter(|q| q["subject"] == subject)
        .map(|q| q["id"].as_i64().unwrap())
        .collect()
}

#[tokio::test]
async fn health_check_404() {
    let app = spawn_app().await;

    let response = app
        .client
        .get(app.url("/random_path_that_does_not_exist"))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn empty_bank_returns_404() {
    let app = spawn_app().await;

    let response = app.client.get(app.url("/api/test")).send().await.unwrap();

    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn login_rejects_wrong_password() {
    let app = spawn_app().await;

    let response = app
        .client
        .post(app.url("/api/auth/login"))
        .json(&json!({ "username": ADMIN_USERNAME, "password": "nope" }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 401);
}

#[tokio::test]
async fn admin_routes_require_admin_role() {
    let app = spawn_app().await;

    let anonymous = app.client.get(app.url("/api/admin/results")).send().await.unwrap();
    assert_eq!(anonymous.status().as_u16(), 401);

    let learner = app.login("learner", "learner_password").await;
    let forbidden = app
        .client
        .get(app.url("/api/admin/results"))
        .bearer_auth(&learner)
        .send()
        .await
        .unwrap();
    assert_eq!(forbidden.status().as_u16(), 403);
}

#[tokio::test]
async fn create_question_validates_payload() {
    let app = spawn_app().await;
    let admin = app.login(ADMIN_USERNAME, ADMIN_PASSWORD).await;

    let response = app
        .client
        .post(app.url("/api/admin/questions"))
        .bearer_auth(&admin)
        .json(&json!({
            "subject": "history",
            "question_text": "Who?",
            "options": ["A", "B"],
            "correct_answer": "A"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);

    let response = app
        .client
        .post(app.url("/api/admin/questions"))
        .bearer_auth(&admin)
        .json(&json!({
            "subject": "physics",
            "question_text": "Unit of force?",
            "options": ["Newton", "Joule"],
            "correct_answer": "Watt"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn test_paper_hides_answers() {
    let app = spawn_app().await;
    let admin = app.login(ADMIN_USERNAME, ADMIN_PASSWORD).await;
    app.seed_questions(&admin).await;

    let questions: Vec<Value> = app
        .client
        .get(app.url("/api/test"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(questions.len(), 25);
    assert!(questions.iter().all(|q| q.get("correct_answer").is_none()));
    let numbers: Vec<i64> = questions
        .iter()
        .map(|q| q["question_number"].as_i64().unwrap())
        .collect();
    assert_eq!(numbers, (1..=25).collect::<Vec<_>>());
}

#[tokio::test]
async fn empty_submission_recommends_arts() {
    let app = spawn_app().await;
    let admin = app.login(ADMIN_USERNAME, ADMIN_PASSWORD).await;
    app.seed_questions(&admin).await;

    // No body at all
    let response = app
        .client
        .post(app.url("/api/test/submit"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    let result: Value = response.json().await.unwrap();
    assert_eq!(result["overall_score"], 0);
    assert_eq!(result["recommended_stream"], "Arts");
    assert_eq!(result["total_questions"], 25);
    assert_eq!(result["username"], "Anonymous");

    // Blank answers only
    let result: Value = app
        .submit(None, json!({ "answers": { "1": "", "2": "   ", "3": null } }))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(result["overall_score"], 0);
    assert_eq!(result["detailed_answers"].as_array().unwrap().len(), 0);
    for subject in ["physics", "chemistry", "maths", "biology", "logicalreasoning"] {
        assert_eq!(result["subject_scores"][subject], 0);
    }
}

#[tokio::test]
async fn science_submission_flow() {
    let app = spawn_app().await;
    let admin = app.login(ADMIN_USERNAME, ADMIN_PASSWORD).await;
    let questions = app.seed_questions(&admin).await;
    let learner = app.login("learner", "learner_password").await;

    let mut answers = HashMap::new();
    for subject in ["physics", "chemistry", "maths", "logicalreasoning"] {
        for id in ids_for(&questions, subject) {
            answers.insert(id.to_string(), "A".to_string());
        }
    }
    // A wrong biology answer and a stale id
    answers.insert(ids_for(&questions, "biology")[0].to_string(), "B".to_string());
    answers.insert("999999".to_string(), "A".to_string());

    let response = app.submit(Some(&learner), json!({ "answers": answers })).await;
    assert_eq!(response.status().as_u16(), 200);
    let result: Value = response.json().await.unwrap();

    assert_eq!(result["overall_score"], 20);
    assert_eq!(result["recommended_stream"], "Science");
    assert_eq!(result["username"], "learner");
    assert_eq!(result["subject_scores"]["physics"], 5);
    assert_eq!(result["subject_scores"]["biology"], 0);
    assert_eq!(result["detailed_answers"].as_array().unwrap().len(), 21);

    // Fetch it back twice
    let result_id = result["result_id"].as_i64().unwrap();
    for _ in 0..2 {
        let fetched: Value = app
            .client
            .get(app.url(&format!("/api/results/{}", result_id)))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(fetched["overall_score"], result["overall_score"]);
        assert_eq!(fetched["subject_scores"], result["subject_scores"]);
        assert_eq!(fetched["recommended_stream"], result["recommended_stream"]);
    }

    // Admin sees it in the listing
    let summaries: Vec<Value> = app
        .client
        .get(app.url("/api/admin/results"))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0]["correct_answers"], 20);
    assert_eq!(summaries[0]["answered_questions"], 21);
    assert_eq!(summaries[0]["top_subject"], "physics");
}

#[tokio::test]
async fn commerce_submission() {
    let app = spawn_app().await;
    let admin = app.login(ADMIN_USERNAME, ADMIN_PASSWORD).await;
    let questions = app.seed_questions(&admin).await;

    // chemistry 4, maths 4, reasoning 3: science 11/20, commerce 11/15
    let mut answers = HashMap::new();
    for (subject, correct) in [("chemistry", 4), ("maths", 4), ("logicalreasoning", 3)] {
        for id in ids_for(&questions, subject).into_iter().take(correct) {
            answers.insert(id.to_string(), "A".to_string());
        }
    }

    let result: Value = app
        .submit(None, json!({ "answers": answers }))
        .await
        .json()
        .await
        .unwrap();

    assert_eq!(result["overall_score"], 11);
    assert_eq!(result["recommended_stream"], "Commerce");
}

#[tokio::test]
async fn aliased_answer_keys_score_once() {
    let app = spawn_app().await;
    let admin = app.login(ADMIN_USERNAME, ADMIN_PASSWORD).await;
    let questions = app.seed_questions(&admin).await;
    let physics = ids_for(&questions, "physics")[0];

    let mut answers = HashMap::new();
    for key in [
        physics.to_string(),
        format!("0{}", physics),
        format!("00{}", physics),
        format!("+{}", physics),
        format!(" {}", physics),
        format!("{} ", physics),
    ] {
        answers.insert(key, "A".to_string());
    }

    let result: Value = app
        .submit(None, json!({ "answers": answers }))
        .await
        .json()
        .await
        .unwrap();

    assert_eq!(result["overall_score"], 1);
    assert_eq!(result["subject_scores"]["physics"], 1);
    assert_eq!(result["recommended_stream"], "Arts");
    assert_eq!(result["detailed_answers"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn unknown_result_returns_404() {
    let app = spawn_app().await;

    let response = app.client.get(app.url("/api/results/424242")).send().await.unwrap();

    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn delete_question_renumbers_bank() {
    let app = spawn_app().await;
    let admin = app.login(ADMIN_USERNAME, ADMIN_PASSWORD).await;
    let questions = app.seed_questions(&admin).await;

    let victim = questions[2]["id"].as_i64().unwrap();
    let response = app
        .client
        .delete(app.url(&format!("/api/admin/questions/{}", victim)))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 204);

    let remaining: Vec<Value> = app
        .client
        .get(app.url("/api/admin/questions"))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let numbers: Vec<i64> = remaining
        .iter()
        .map(|q| q["question_number"].as_i64().unwrap())
        .collect();
    assert_eq!(numbers, (1..=24).collect::<Vec<_>>());

    let again = app
        .client
        .delete(app.url(&format!("/api/admin/questions/{}", victim)))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(again.status().as_u16(), 404);
}

#[tokio::test]
async fn admin_filters_questions_and_reports_stats() {
    let app = spawn_app().await;
    let admin = app.login(ADMIN_USERNAME, ADMIN_PASSWORD).await;
    app.seed_questions(&admin).await;
    app.submit(None, json!({})).await;

    let maths: Vec<Value> = app
        .client
        .get(app.url("/api/admin/questions?subject=maths"))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(maths.len(), 5);
    assert!(maths.iter().all(|q| q["subject"] == "maths"));

    let stats: Value = app
        .client
        .get(app.url("/api/admin/stats"))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(stats["total_questions"], 25);
    assert_eq!(stats["questions_per_subject"]["biology"], 5);
    assert_eq!(stats["total_results"], 1);
    assert_eq!(stats["results_per_stream"]["Arts"], 1);
    assert_eq!(stats["results_per_stream"]["Science"], 0);
}

#[tokio::test]
async fn admin_can_delete_result() {
    let app = spawn_app().await;
    let admin = app.login(ADMIN_USERNAME, ADMIN_PASSWORD).await;
    let result: Value = app.submit(None, json!({})).await.json().await.unwrap();
    let result_id = result["result_id"].as_i64().unwrap();

    let response = app
        .client
        .delete(app.url(&format!("/api/admin/results/{}", result_id)))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 204);

    let gone = app
        .client
        .get(app.url(&format!("/api/results/{}", result_id)))
        .send()
        .await
        .unwrap();
    assert_eq!(gone.status().as_u16(), 404);
}

#[tokio::test]
async fn list_tests_describes_aptitude_test() {
    let app = spawn_app().await;

    let body: Value = app
        .client
        .get(app.url("/api/tests"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body["tests"][0]["id"], "aptitude");
    assert_eq!(body["tests"][0]["subjects"].as_array().unwrap().len(), 5);
}
