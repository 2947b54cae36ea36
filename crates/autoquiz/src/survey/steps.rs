use super::domain::FieldKey;

pub const VEHICLE_TYPES: &[&str] = &["Car", "SUV", "Truck", "Sedan"];
pub const BUDGETS: &[&str] = &["Under $400", "$400-499", "$500-600", "Over $600"];
pub const TRADE_IN: &[&str] = &["Yes", "No", "Unsure"];
pub const CREDIT_SCORES: &[&str] = &[
    "Excellent (760-900)",
    "Very Good (725-759)",
    "Good (660-724)",
    "Fair (600-659)",
    "Poor (300-599)",
    "No Credit / Unsure",
];
pub const EMPLOYMENT: &[&str] = &[
    "Employed",
    "Self-Employed",
    "Student",
    "Retired/Pension",
    "Other",
];
pub const INCOME: &[&str] = &["$2000-$2500", "$2501-$3500", "$3501-$4500", "$4500+"];
pub const EMPLOYMENT_LENGTH: &[&str] = &["Less than 3 Months", "3 Months-2 Years", "2+ Years"];

/// How the step collects its answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    SingleChoice { options: &'static [&'static str] },
    FreeText,
    Date,
    File,
    Address,
    MultiField,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepDefinition {
    pub index: usize,
    pub key: &'static str,
    pub prompt: &'static str,
    pub fields: &'static [FieldKey],
    pub input: InputKind,
    pub auto_advance: bool,
    pub optional: bool,
    /// Shown when a required field on the step is still empty.
    pub missing_message: &'static str,
}

impl StepDefinition {
    pub fn touches(&self, field: FieldKey) -> bool {
        self.fields.contains(&field)
    }

    pub fn options(&self) -> &'static [&'static str] {
        match self.input {
            InputKind::SingleChoice { options } => options,
            _ => &[],
        }
    }

    pub fn accepts_option(&self, value: &str) -> bool {
        self.options().iter().any(|option| *option == value)
    }
}

/// Ordered step table for the lead survey.
#[derive(Debug)]
pub struct SurveyBlueprint {
    steps: Vec<StepDefinition>,
}

impl SurveyBlueprint {
    pub fn standard() -> Self {
        let steps = standard_steps()
            .into_iter()
            .enumerate()
            .map(|(index, step)| StepDefinition { index, ..step })
            .collect();
        Self { steps }
    }

    pub fn steps(&self) -> &[StepDefinition] {
        &self.steps
    }

    pub fn step(&self, index: usize) -> Option<&StepDefinition> {
        self.steps.get(index)
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn step_for_field(&self, field: FieldKey) -> Option<&StepDefinition> {
        self.steps.iter().find(|step| step.touches(field))
    }
}

fn choice(
    key: &'static str,
    prompt: &'static str,
    field: &'static [FieldKey],
    options: &'static [&'static str],
    missing_message: &'static str,
) -> StepDefinition {
    StepDefinition {
        index: 0,
        key,
        prompt,
        fields: field,
        input: InputKind::SingleChoice { options },
        auto_advance: true,
        optional: false,
        missing_message,
    }
}

fn standard_steps() -> Vec<StepDefinition> {
    vec![
        choice(
            "vehicle_type",
            "What type of vehicle are you looking for?",
            &[FieldKey::VehicleType],
            VEHICLE_TYPES,
            "Please select a vehicle type",
        ),
        StepDefinition {
            index: 0,
            key: "desired_vehicle",
            prompt: "Looking for a specific vehicle?",
            fields: &[FieldKey::DesiredVehicle],
            input: InputKind::FreeText,
            auto_advance: false,
            optional: true,
            missing_message: "",
        },
        choice(
            "budget",
            "What is your monthly budget?",
            &[FieldKey::Budget],
            BUDGETS,
            "Please select your monthly budget",
        ),
        choice(
            "trade_in",
            "Do you have a trade-in?",
            &[FieldKey::TradeIn],
            TRADE_IN,
            "Please tell us whether you have a trade-in",
        ),
        choice(
            "credit_score",
            "What is your estimated credit rating?",
            &[FieldKey::CreditScore],
            CREDIT_SCORES,
            "Please select your estimated credit score",
        ),
        choice(
            "employment",
            "What is your employment status?",
            &[FieldKey::Employment],
            EMPLOYMENT,
            "Please select your employment status",
        ),
        choice(
            "income",
            "What is your monthly income?",
            &[FieldKey::Income],
            INCOME,
            "Please select your monthly income",
        ),
        choice(
            "employment_length",
            "How long have you been employed at your current job?",
            &[FieldKey::EmploymentLength],
            EMPLOYMENT_LENGTH,
            "Please select how long you have been employed",
        ),
        StepDefinition {
            index: 0,
            key: "employer",
            prompt: "Where do you work?",
            fields: &[FieldKey::CompanyName, FieldKey::JobTitle],
            input: InputKind::MultiField,
            auto_advance: false,
            optional: false,
            missing_message: "Please enter your company name and job title",
        },
        StepDefinition {
            index: 0,
            key: "address",
            prompt: "What is your current address?",
            fields: &[
                FieldKey::StreetAddress,
                FieldKey::City,
                FieldKey::Province,
                FieldKey::PostalCode,
            ],
            input: InputKind::Address,
            auto_advance: false,
            optional: false,
            missing_message: "Please complete your street address, city, province and postal code",
        },
        StepDefinition {
            index: 0,
            key: "date_of_birth",
            prompt: "What is your date of birth?",
            fields: &[FieldKey::DateOfBirth],
            input: InputKind::Date,
            auto_advance: false,
            optional: false,
            missing_message: "Please select your date of birth",
        },
        StepDefinition {
            index: 0,
            key: "pay_stub",
            prompt: "Upload a recent pay stub (optional)",
            fields: &[],
            input: InputKind::File,
            auto_advance: false,
            optional: true,
            missing_message: "",
        },
        StepDefinition {
            index: 0,
            key: "contact",
            prompt: "Where should we send your approval?",
            fields: &[FieldKey::FullName, FieldKey::Phone, FieldKey::Email],
            input: InputKind::MultiField,
            auto_advance: false,
            optional: false,
            missing_message: "Please enter your full name, phone number and email address",
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_blueprint_is_indexed_in_order() {
        let blueprint = SurveyBlueprint::standard();
        assert_eq!(blueprint.len(), 13);
        for (position, step) in blueprint.steps().iter().enumerate() {
            assert_eq!(step.index, position);
        }
        assert_eq!(blueprint.steps()[0].key, "vehicle_type");
        assert_eq!(blueprint.steps()[12].key, "contact");
    }

    #[test]
    fn single_choice_steps_auto_advance_and_others_do_not() {
        let blueprint = SurveyBlueprint::standard();
        for step in blueprint.steps() {
            let is_choice = matches!(step.input, InputKind::SingleChoice { .. });
            assert_eq!(step.auto_advance, is_choice, "step {}", step.key);
        }
    }

    #[test]
    fn only_desired_vehicle_and_pay_stub_are_optional() {
        let blueprint = SurveyBlueprint::standard();
        let optional: Vec<_> = blueprint
            .steps()
            .iter()
            .filter(|step| step.optional)
            .map(|step| step.key)
            .collect();
        assert_eq!(optional, vec!["desired_vehicle", "pay_stub"]);
    }

    #[test]
    fn every_record_field_belongs_to_exactly_one_step() {
        let blueprint = SurveyBlueprint::standard();
        let budget_step = blueprint
            .step_for_field(FieldKey::Budget)
            .expect("budget step present");
        assert_eq!(budget_step.key, "budget");
        assert!(budget_step.accepts_option("$400-499"));
        assert!(!budget_step.accepts_option("$10"));

        let contact_hits = blueprint
            .steps()
            .iter()
            .filter(|step| step.touches(FieldKey::Email))
            .count();
        assert_eq!(contact_hits, 1);
    }
}
