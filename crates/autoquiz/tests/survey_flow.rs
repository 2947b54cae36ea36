use autoquiz::places::StructuredAddress;
use autoquiz::survey::{
    validate_submission, Advance, FieldKey, FieldUpdate, LeadRecord, SurveyController,
    SurveyCursor,
};

fn choose(controller: &mut SurveyController, field: FieldKey, option: &str) {
    let update = controller
        .update_field(field, option)
        .expect("session is open");
    assert!(
        matches!(update, FieldUpdate::Advanced(Advance::Moved { .. })),
        "{option} should auto-advance"
    );
}

fn fill(controller: &mut SurveyController, values: &[(FieldKey, &str)]) {
    for (field, value) in values {
        assert_eq!(
            controller
                .update_field(*field, *value)
                .expect("session is open"),
            FieldUpdate::Recorded
        );
    }
}

fn next(controller: &mut SurveyController) {
    let outcome = controller.go_next();
    assert!(
        matches!(outcome, Advance::Moved { .. } | Advance::Completed),
        "step rejected: {outcome:?}"
    );
}

#[test]
fn happy_path_walks_every_step_to_completion() {
    let mut controller = SurveyController::default();
    assert_eq!(controller.total_steps(), 13);

    choose(&mut controller, FieldKey::VehicleType, "SUV");
    fill(&mut controller, &[(FieldKey::DesiredVehicle, "RAV4")]);
    next(&mut controller);
    choose(&mut controller, FieldKey::Budget, "$400-499");
    choose(&mut controller, FieldKey::TradeIn, "No");
    choose(&mut controller, FieldKey::CreditScore, "Good (660-724)");
    choose(&mut controller, FieldKey::Employment, "Employed");
    choose(&mut controller, FieldKey::Income, "$3501-$4500");
    choose(&mut controller, FieldKey::EmploymentLength, "2+ Years");
    assert_eq!(controller.progress_label(), "Step 9 of 13");

    fill(
        &mut controller,
        &[(FieldKey::CompanyName, "Acme"), (FieldKey::JobTitle, "Clerk")],
    );
    next(&mut controller);

    controller
        .apply_address(&StructuredAddress {
            street_address: "1 Main St".to_string(),
            city: "London".to_string(),
            province: "ON".to_string(),
            postal_code: "N6C 4X5".to_string(),
        })
        .expect("address applied");
    next(&mut controller);

    fill(&mut controller, &[(FieldKey::DateOfBirth, "1990-04-12")]);
    next(&mut controller);

    // Pay stub is optional.
    next(&mut controller);

    fill(
        &mut controller,
        &[
            (FieldKey::FullName, "Jane Doe"),
            (FieldKey::Phone, "5195551234"),
            (FieldKey::Email, "jane@example.com"),
        ],
    );
    assert_eq!(controller.go_next(), Advance::Completed);
    assert!(controller.is_complete());
    assert_eq!(controller.cursor(), SurveyCursor::Complete);

    let record = controller.into_record();
    assert_eq!(record.vehicle_info.desired_vehicle, "RAV4");
    assert_eq!(record.personal_info.city, "London");
    assert!(validate_submission(&record).is_ok());

    let wire = serde_json::to_string(&record).expect("record serializes");
    let parsed: LeadRecord = serde_json::from_str(&wire).expect("record parses");
    assert_eq!(parsed, record);
}

#[test]
fn empty_budget_keeps_the_cursor_and_mentions_budget() {
    let mut controller = SurveyController::default();
    choose(&mut controller, FieldKey::VehicleType, "Truck");
    next(&mut controller);
    assert_eq!(controller.cursor(), SurveyCursor::Step(2));

    let outcome = controller.go_next();
    let Advance::Rejected { message } = outcome else {
        panic!("empty budget must be rejected");
    };
    assert!(message.to_lowercase().contains("budget"));
    assert_eq!(controller.cursor(), SurveyCursor::Step(2));
}

#[test]
fn bad_email_blocks_completion_until_corrected() {
    let mut controller = SurveyController::default();
    while controller
        .current_step()
        .map(|step| step.key != "contact")
        .unwrap_or(false)
    {
        let index = match controller.cursor() {
            SurveyCursor::Step(index) => index,
            SurveyCursor::Complete => break,
        };
        let step = controller.current_step().cloned().expect("step present");
        if let Some(option) = step.options().first() {
            controller
                .update_field(step.fields[0], *option)
                .expect("session is open");
        } else {
            for field in step.fields {
                controller
                    .update_field(*field, "filled")
                    .expect("session is open");
            }
            controller.go_next();
        }
        assert!(controller.cursor() != SurveyCursor::Step(index), "stuck at {}", step.key);
    }

    fill(
        &mut controller,
        &[
            (FieldKey::FullName, "Jane Doe"),
            (FieldKey::Phone, "5195551234"),
            (FieldKey::Email, "not-an-email"),
        ],
    );
    let Advance::Rejected { message } = controller.go_next() else {
        panic!("invalid email must be rejected");
    };
    assert!(message.contains("valid email"));

    fill(&mut controller, &[(FieldKey::Email, "a@b.com")]);
    assert!(controller.validation_error().is_none());
    assert_eq!(controller.go_next(), Advance::Completed);
}
