//! Built-in declarations for the CES API.

use super::{KindDecl, Registry};

const AUDIT_FIELDS: [&str; 2] = ["created", "updated"];

impl Registry {
    /// Registry describing the CES API resources and their sub-resources.
    ///
    /// Paths match the upstream API documentation, relative to `/api/`.
    pub fn ces() -> Registry {
        Registry::builder()
            .kind(
                KindDecl::new("Account")
                    .fields(["id", "name", "parentId", "timeZone"])
                    .fields(AUDIT_FIELDS)
                    .root("account"),
            )
            .kind(
                KindDecl::new("SubAccount")
                    .fields(["id", "name", "parentId"])
                    .root("subAccounts"),
            )
            .kind(
                KindDecl::new("Term")
                    .fields(["id", "name", "startDate", "endDate", "accountId"])
                    .root("terms"),
            )
            .kind(
                KindDecl::new("User")
                    .fields(["userId", "username", "firstName", "lastName", "email", "userType"])
                    .fields(["userTypes", "accountId", "nodePath"])
                    .root("users")
                    .many(
                        "metadata",
                        "Metadata",
                        "users/metadata?username={username}",
                    ),
            )
            .kind(
                KindDecl::new("Node")
                    .fields(["id", "parentId", "accountId", "name", "level", "nodePath"])
                    .root("nodes"),
            )
            .kind(
                KindDecl::new("Course")
                    .fields(["id", "uniqueId", "courseCode", "name", "termId", "accountId"])
                    .fields(["startDate", "endDate"])
                    .fields(AUDIT_FIELDS)
                    .root("courses")
                    .many("projects", "Project", "courses/{id}/projects")
                    .many("metadata", "Metadata", "courses/{id}/metadata"),
            )
            .kind(
                KindDecl::new("Survey")
                    .fields(["id", "name", "surveyType", "accountId"])
                    .fields(AUDIT_FIELDS)
                    .root("surveys")
                    .many("questions", "Question", "surveys/{id}/Questions")
                    .many("response_rate", "ResponseRate", "SurveyResponseRate/{id}"),
            )
            .kind(
                KindDecl::new("Project")
                    .fields(["id", "title", "accountId", "projectType", "projectStatus"])
                    .fields(["mainSurveyId", "termId", "startDate", "endDate"])
                    .fields(AUDIT_FIELDS)
                    .root("projects")
                    .many("surveys", "ProjectSurvey", "projects/{id}/surveys")
                    .many("courses", "ProjectCourse", "projects/{id}/courses")
                    .many("respondents", "Respondent", "projects/{id}/respondents")
                    .many("non_respondents", "NonRespondent", "projects/{id}/nonRespondents")
                    .many("response_rate", "ResponseRate", "projects/{id}/responseRate")
                    .one(
                        "overall_response_rate",
                        "OverallResponseRate",
                        "projects/{id}/OverallResponseRate",
                    )
                    .many("raw_data", "RawDataGeneral", "projects/{id}/general/rawData"),
            )
            .kind(
                KindDecl::new("ProjectSurvey")
                    .fields(["id", "projectId", "surveyId", "name", "courseSurveyStart"])
                    .fields(["courseSurveyEnd"])
                    .one("survey", "Survey", "surveys/{surveyId}"),
            )
            .kind(
                KindDecl::new("ProjectCourse")
                    .fields(["id", "projectId", "courseId", "courseCode", "name"]),
            )
            .kind(
                KindDecl::new("Question")
                    .fields(["id", "surveyId", "questionText", "questionType", "options"]),
            )
            .kind(KindDecl::new("ResponseRate").fields([
                "projectId",
                "courseId",
                "invited",
                "responded",
                "responseRate",
            ]))
            .kind(KindDecl::new("OverallResponseRate").fields([
                "projectId",
                "invited",
                "responded",
                "responseRate",
            ]))
            .kind(
                KindDecl::new("Respondent")
                    .fields(["userId", "username", "courseId", "submitDateTime"]),
            )
            .kind(KindDecl::new("NonRespondent").fields(["userId", "username", "courseId"]))
            .kind(
                KindDecl::new("RawDataGeneral")
                    .fields(["responseId", "questionId", "courseId", "answer", "submitDate"]),
            )
            .kind(KindDecl::new("Metadata").fields(["name", "value"]))
            .build()
            .expect("built-in CES declarations are valid")
    }
}
