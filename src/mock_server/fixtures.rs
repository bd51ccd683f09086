//! Test data fixtures for the mock server.
//!
//! Provides factory functions for creating realistic test data.

use serde_json::{json, Value};

use super::state::MockState;

/// Collection of fixture factories for test data.
pub struct Fixtures;

impl Fixtures {
    // =========================================================================
    // Record Fixtures
    // =========================================================================

    pub fn course(id: i64, name: &str, term_id: i64) -> Value {
        json!({
            "id": id,
            "name": name,
            "uniqueId": format!("C-{id}"),
            "courseCode": format!("CRS{id:03}"),
            "termId": term_id,
            "accountId": 1,
        })
    }

    pub fn project(id: i64, title: &str, status: i64) -> Value {
        json!({
            "id": id,
            "title": title,
            "projectStatus": status,
            "startDate": "2024-01-08T00:00:00Z",
            "endDate": "2024-05-10T00:00:00Z",
        })
    }

    pub fn survey(id: i64, name: &str) -> Value {
        json!({"id": id, "name": name, "surveyType": 1})
    }

    /// A project-survey link row.
    pub fn project_survey(project_id: i64, survey_id: i64) -> Value {
        json!({"projectId": project_id, "surveyId": survey_id})
    }

    pub fn question(id: i64, survey_id: i64, text: &str) -> Value {
        json!({"id": id, "surveyId": survey_id, "questionText": text})
    }

    pub fn response_rate(project_id: i64, responded: i64, invited: i64) -> Value {
        let rate = if invited > 0 {
            responded as f64 / invited as f64
        } else {
            0.0
        };
        json!({
            "projectId": project_id,
            "invited": invited,
            "responded": responded,
            "responseRate": rate,
        })
    }

    // =========================================================================
    // Scenarios
    // =========================================================================

    /// One account with two terms, three courses and their evaluation
    /// projects, surveys and response data.
    ///
    /// Course 1 has projects 10 and 11, course 2 has project 20 and course 3
    /// has none.
    pub fn default_state() -> MockState {
        MockState::new()
            .with_single("account", json!({"id": 1, "name": "Example University"}))
            .with_list(
                "subAccounts",
                vec![json!({"id": 2, "name": "School of Science", "parentId": 1})],
            )
            .with_list(
                "terms",
                vec![
                    json!({"id": 1, "name": "Fall 2023"}),
                    json!({"id": 2, "name": "Spring 2024"}),
                ],
            )
            .with_list(
                "nodes",
                vec![json!({"id": 1, "name": "Root", "parentId": null})],
            )
            .with_list(
                "users",
                vec![
                    json!({"userId": 100, "username": "jdoe", "firstName": "Jane", "lastName": "Doe"}),
                    json!({"userId": 101, "username": "rroe", "firstName": "Rick", "lastName": "Roe"}),
                ],
            )
            .with_list(
                "users/metadata?username=jdoe",
                vec![json!({"name": "department", "value": "Biology"})],
            )
            .with_single("users/hasInProgressSurvey?username=jdoe", json!({"result": true}))
            .with_single("users/hasGradeBlock?username=jdoe", json!({"result": false}))
            .with_list(
                "courses",
                vec![
                    Self::course(1, "Algebra I", 1),
                    Self::course(2, "Biology 101", 2),
                    Self::course(3, "Chemistry Lab", 2),
                ],
            )
            .with_list(
                "courses/1/projects",
                vec![
                    Self::project(10, "Fall 2023 Evaluations", 2),
                    Self::project(11, "Fall 2023 Midterm Check-in", 3),
                ],
            )
            .with_list(
                "courses/2/projects",
                vec![Self::project(20, "Spring 2024 Evaluations", 2)],
            )
            .with_list("courses/3/projects", vec![])
            .with_list(
                "courses/1/metadata",
                vec![json!({"name": "format", "value": "online"})],
            )
            .with_list(
                "projects",
                vec![
                    Self::project(10, "Fall 2023 Evaluations", 2),
                    Self::project(11, "Fall 2023 Midterm Check-in", 3),
                    Self::project(20, "Spring 2024 Evaluations", 2),
                ],
            )
            .with_list(
                "projects/10/surveys",
                vec![Self::project_survey(10, 500), Self::project_survey(10, 501)],
            )
            .with_list("projects/11/surveys", vec![Self::project_survey(11, 500)])
            .with_list("projects/20/surveys", vec![Self::project_survey(20, 502)])
            .with_single("projects/10/responseRate", Self::response_rate(10, 30, 40))
            .with_single(
                "projects/10/OverallResponseRate",
                Self::response_rate(10, 30, 40),
            )
            .with_single("projects/11/responseRate", Self::response_rate(11, 0, 12))
            .with_single("projects/20/responseRate", Self::response_rate(20, 18, 20))
            .with_list(
                "surveys",
                vec![
                    Self::survey(500, "Course Evaluation"),
                    Self::survey(501, "Instructor Evaluation"),
                    Self::survey(502, "Lab Evaluation"),
                ],
            )
            .with_single("surveys/500", Self::survey(500, "Course Evaluation"))
            .with_single("surveys/501", Self::survey(501, "Instructor Evaluation"))
            .with_single("surveys/502", Self::survey(502, "Lab Evaluation"))
            .with_list(
                "surveys/500/Questions",
                vec![
                    Self::question(1, 500, "The course was well organized."),
                    Self::question(2, 500, "I would recommend this course."),
                ],
            )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock_server::state::Resource;
    use std::collections::BTreeMap;

    #[test]
    fn test_default_state_has_courses() {
        let state = Fixtures::default_state();
        match state.lookup("courses", &BTreeMap::new()) {
            Some(Resource::List(rows)) => assert_eq!(rows.len(), 3),
            other => panic!("expected course list, got {other:?}"),
        }
    }

    #[test]
    fn test_response_rate_fixture() {
        let rate = Fixtures::response_rate(10, 30, 40);
        assert_eq!(rate["responseRate"], json!(0.75));
        assert_eq!(Fixtures::response_rate(10, 0, 0)["responseRate"], json!(0.0));
    }
}
