use std::collections::BTreeMap;

use cadence_client::payload::{
    CloneTemplate, MinorQuestionPatch, NewDimension, NewQuestion, NewTemplate, QuestionPatch,
};
use cadence_client::{ClientError, MemoryTemplateApi, TemplateApi};
use cadence_core::models::dimension::Dimension;
use cadence_core::models::framework::AssessmentType;
use cadence_core::models::question::Question;
use cadence_core::models::template::{Template, TemplateStatus};
use cadence_core::rubric::{RubricField, ScoreMaps};

fn question(id: i64, dimension_id: i64, order: i32) -> Question {
    Question {
        id,
        dimension_id,
        question_number: format!("1.{order}"),
        question_text: format!("Question {id}"),
        display_order: order,
        is_required: false,
        min_score: 1,
        max_score: 5,
        score_labels: BTreeMap::from([("1".to_string(), "Initial".to_string())]),
        score_descriptions: BTreeMap::new(),
        score_evidence: BTreeMap::new(),
    }
}

fn seeded() -> MemoryTemplateApi {
    let api = MemoryTemplateApi::new();
    api.add_assessment_type(AssessmentType {
        id: 1,
        code: "hc".to_string(),
        name: "Health Check".to_string(),
        short_name: Some("HC".to_string()),
    });
    api.insert_template(Template {
        id: 5,
        type_code: "hc".to_string(),
        name: "Health Check".to_string(),
        description: None,
        version: "1.0".to_string(),
        status: TemplateStatus::Active,
        dimensions: vec![Dimension {
            id: 3,
            template_id: 5,
            name: "Adoption".to_string(),
            description: None,
            weight: 2.0,
            display_order: 0,
        }],
        questions: vec![question(7, 3, 0), question(8, 3, 1)],
        updated_at: None,
    });
    api
}

#[tokio::test]
async fn clone_deep_copies_with_fresh_ids() {
    let api = seeded();

    let draft = api
        .clone_template(5, CloneTemplate { new_version: "1.1".to_string() })
        .await
        .unwrap();

    assert_eq!(draft.status, TemplateStatus::Draft);
    assert_eq!(draft.version, "1.1");
    assert_ne!(draft.id, 5);
    assert_eq!(draft.dimensions.len(), 1);
    assert_eq!(draft.questions.len(), 2);

    let source = api.template(5).unwrap();
    assert_ne!(draft.dimensions[0].id, source.dimensions[0].id);
    assert_eq!(draft.dimensions[0].template_id, draft.id);
    assert_eq!(draft.dimensions[0].name, source.dimensions[0].name);
    for (copy, original) in draft.questions.iter().zip(&source.questions) {
        assert_ne!(copy.id, original.id);
        assert_eq!(copy.dimension_id, draft.dimensions[0].id);
        assert_eq!(copy.question_text, original.question_text);
        assert_eq!(copy.score_labels, original.score_labels);
    }
}

#[tokio::test]
async fn duplicate_version_is_a_conflict() {
    let api = seeded();

    let err = api
        .clone_template(5, CloneTemplate { new_version: "1.0".to_string() })
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Status { status: 409, .. }), "{err:?}");
}

#[tokio::test]
async fn promotion_leaves_exactly_one_active_template() {
    let api = seeded();
    let draft = api
        .clone_template(5, CloneTemplate { new_version: "2.0".to_string() })
        .await
        .unwrap();

    let promoted = api.promote_template(draft.id).await.unwrap();
    assert_eq!(promoted.status, TemplateStatus::Active);

    let summaries = api.list_templates("hc".to_string()).await.unwrap();
    let active: Vec<_> = summaries
        .iter()
        .filter(|t| t.status == TemplateStatus::Active)
        .collect();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].id, draft.id);
    assert_eq!(api.template(5).unwrap().status, TemplateStatus::Archived);

    // Promoting a non-draft is refused.
    assert!(api.promote_template(draft.id).await.is_err());
}

#[tokio::test]
async fn active_templates_refuse_general_edits_but_take_minor_and_scores() {
    let api = seeded();

    let general = api
        .update_question(
            7,
            QuestionPatch {
                question_text: Some("Rewritten".to_string()),
                ..Default::default()
            },
        )
        .await;
    assert!(matches!(general, Err(ClientError::Status { status: 409, .. })));

    let minor = api
        .update_question_minor(
            7,
            MinorQuestionPatch {
                question_text: Some("Rewritten".to_string()),
                question_number: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(minor.question_text, "Rewritten");

    let scores = ScoreMaps::default().with_cell(5, RubricField::Description, "Fully embedded");
    let updated = api.update_question_scores(7, scores.clone()).await.unwrap();
    assert_eq!(updated.score_maps(), scores);
}

#[tokio::test]
async fn deleting_a_dimension_cascades_to_its_questions() {
    let api = seeded();
    let draft = api
        .clone_template(5, CloneTemplate { new_version: "1.1".to_string() })
        .await
        .unwrap();
    let dimension_id = draft.dimensions[0].id;

    api.delete_dimension(dimension_id).await.unwrap();

    let reloaded = api.get_template(draft.id).await.unwrap();
    assert!(reloaded.dimensions.is_empty());
    assert!(reloaded.questions.is_empty());
    // The source template is untouched.
    assert_eq!(api.template(5).unwrap().questions.len(), 2);
}

#[tokio::test]
async fn structure_changes_require_a_draft() {
    let api = seeded();

    let dimension = NewDimension {
        name: "Value".to_string(),
        description: None,
        weight: 1.0,
        display_order: 1,
    };
    assert!(api.create_dimension(5, dimension.clone()).await.is_err());

    let created = api
        .create_template(NewTemplate {
            type_code: "hc".to_string(),
            name: "Health Check".to_string(),
            description: None,
            version: "0.1".to_string(),
        })
        .await
        .unwrap();
    let dim = api.create_dimension(created.id, dimension).await.unwrap();

    let question = api
        .create_question(
            created.id,
            NewQuestion {
                dimension_id: dim.id,
                question_number: "1.1".to_string(),
                question_text: String::new(),
                display_order: 0,
                is_required: false,
                min_score: 1,
                max_score: 5,
            },
        )
        .await
        .unwrap();
    assert_eq!(question.dimension_id, dim.id);
}

#[tokio::test]
async fn unknown_framework_and_blank_fields_are_bad_requests() {
    let api = seeded();

    let err = api
        .create_template(NewTemplate {
            type_code: "nope".to_string(),
            name: "X".to_string(),
            description: None,
            version: "1".to_string(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Status { status: 400, .. }));

    let err = api
        .clone_template(5, CloneTemplate { new_version: " ".to_string() })
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Status { status: 400, .. }));
}

#[tokio::test]
async fn audit_is_newest_first_and_limited() {
    let api = seeded();
    api.set_actor("Ada", "Lovelace");

    for text in ["one", "two", "three"] {
        api.update_question_minor(
            7,
            MinorQuestionPatch {
                question_text: Some(text.to_string()),
                question_number: None,
            },
        )
        .await
        .unwrap();
    }

    let entries = api.list_audit(5, 2).await.unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].new_value.as_deref(), Some("three"));
    assert_eq!(entries[1].new_value.as_deref(), Some("two"));
    assert_eq!(
        entries[0].changed_by.as_ref().map(|u| u.display_name()),
        Some("Ada Lovelace".to_string())
    );
}

#[tokio::test]
async fn missing_entities_are_not_found() {
    let api = seeded();
    assert!(api.get_template(99).await.unwrap_err().is_not_found());
    assert!(api.delete_question(99).await.unwrap_err().is_not_found());
}
