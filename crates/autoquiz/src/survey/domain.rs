use serde::{Deserialize, Serialize};

/// Applicant contact, address and employer details.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PersonalInfo {
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub street_address: String,
    pub city: String,
    pub province: String,
    pub postal_code: String,
    pub date_of_birth: String,
    pub company_name: String,
    pub job_title: String,
}

impl PersonalInfo {
    /// Split the full name into first and last parts for sinks that want both.
    pub fn split_name(&self) -> (String, String) {
        let mut parts = self.full_name.split_whitespace();
        let first = parts.next().unwrap_or_default().to_string();
        let last = parts.collect::<Vec<_>>().join(" ");
        (first, last)
    }

    pub fn mailing_address(&self) -> String {
        format!(
            "{}, {}, {} {}",
            self.street_address, self.city, self.province, self.postal_code
        )
    }
}

/// Vehicle preference and financial qualification answers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VehicleInfo {
    pub vehicle_type: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub desired_vehicle: String,
    pub budget: String,
    pub trade_in: String,
    pub credit_score: String,
    pub employment: String,
    pub employment_length: String,
    pub income: String,
}

/// Uploaded pay stub, kept as the data URL the browser produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayStub {
    #[serde(rename = "original")]
    pub data_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compressed: Option<String>,
    pub filename: String,
    #[serde(default)]
    pub size: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Documents {
    #[serde(
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_pay_stub"
    )]
    pub pay_stub: Option<PayStub>,
}

impl Documents {
    pub fn is_empty(&self) -> bool {
        self.pay_stub.is_none()
    }
}

/// The aggregate built up over a survey session and handed to the sinks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LeadRecord {
    pub personal_info: PersonalInfo,
    pub vehicle_info: VehicleInfo,
    #[serde(skip_serializing_if = "Documents::is_empty")]
    pub documents: Documents,
}

impl LeadRecord {
    pub fn get(&self, field: FieldKey) -> &str {
        let personal = &self.personal_info;
        let vehicle = &self.vehicle_info;
        match field {
            FieldKey::VehicleType => &vehicle.vehicle_type,
            FieldKey::DesiredVehicle => &vehicle.desired_vehicle,
            FieldKey::Budget => &vehicle.budget,
            FieldKey::TradeIn => &vehicle.trade_in,
            FieldKey::CreditScore => &vehicle.credit_score,
            FieldKey::Employment => &vehicle.employment,
            FieldKey::Income => &vehicle.income,
            FieldKey::EmploymentLength => &vehicle.employment_length,
            FieldKey::CompanyName => &personal.company_name,
            FieldKey::JobTitle => &personal.job_title,
            FieldKey::StreetAddress => &personal.street_address,
            FieldKey::City => &personal.city,
            FieldKey::Province => &personal.province,
            FieldKey::PostalCode => &personal.postal_code,
            FieldKey::DateOfBirth => &personal.date_of_birth,
            FieldKey::FullName => &personal.full_name,
            FieldKey::Phone => &personal.phone,
            FieldKey::Email => &personal.email,
        }
    }

    pub fn set(&mut self, field: FieldKey, value: String) {
        *self.slot_mut(field) = value;
    }

    fn slot_mut(&mut self, field: FieldKey) -> &mut String {
        let personal = &mut self.personal_info;
        let vehicle = &mut self.vehicle_info;
        match field {
            FieldKey::VehicleType => &mut vehicle.vehicle_type,
            FieldKey::DesiredVehicle => &mut vehicle.desired_vehicle,
            FieldKey::Budget => &mut vehicle.budget,
            FieldKey::TradeIn => &mut vehicle.trade_in,
            FieldKey::CreditScore => &mut vehicle.credit_score,
            FieldKey::Employment => &mut vehicle.employment,
            FieldKey::Income => &mut vehicle.income,
            FieldKey::EmploymentLength => &mut vehicle.employment_length,
            FieldKey::CompanyName => &mut personal.company_name,
            FieldKey::JobTitle => &mut personal.job_title,
            FieldKey::StreetAddress => &mut personal.street_address,
            FieldKey::City => &mut personal.city,
            FieldKey::Province => &mut personal.province,
            FieldKey::PostalCode => &mut personal.postal_code,
            FieldKey::DateOfBirth => &mut personal.date_of_birth,
            FieldKey::FullName => &mut personal.full_name,
            FieldKey::Phone => &mut personal.phone,
            FieldKey::Email => &mut personal.email,
        }
    }

    pub fn pay_stub(&self) -> Option<&PayStub> {
        self.documents.pay_stub.as_ref()
    }
}

/// Every string field a survey step can read or write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FieldKey {
    VehicleType,
    DesiredVehicle,
    Budget,
    TradeIn,
    CreditScore,
    Employment,
    Income,
    EmploymentLength,
    CompanyName,
    JobTitle,
    StreetAddress,
    City,
    Province,
    PostalCode,
    DateOfBirth,
    FullName,
    Phone,
    Email,
}

impl FieldKey {
    /// Human wording used in validation messages.
    pub const fn label(self) -> &'static str {
        match self {
            Self::VehicleType => "vehicle type",
            Self::DesiredVehicle => "desired vehicle",
            Self::Budget => "monthly budget",
            Self::TradeIn => "trade-in preference",
            Self::CreditScore => "credit score",
            Self::Employment => "employment status",
            Self::Income => "monthly income",
            Self::EmploymentLength => "employment length",
            Self::CompanyName => "company name",
            Self::JobTitle => "job title",
            Self::StreetAddress => "street address",
            Self::City => "city",
            Self::Province => "province",
            Self::PostalCode => "postal code",
            Self::DateOfBirth => "date of birth",
            Self::FullName => "full name",
            Self::Phone => "phone number",
            Self::Email => "email address",
        }
    }
}

/// Older clients stored the pay stub as a bare image data URL string rather than an
/// object. Any other leftover string is dropped.
fn deserialize_pay_stub<'de, D>(deserializer: D) -> Result<Option<PayStub>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Wire {
        Structured(PayStub),
        Legacy(String),
    }

    let wire = Option::<Wire>::deserialize(deserializer)?;
    Ok(match wire {
        Some(Wire::Structured(stub)) => Some(stub),
        Some(Wire::Legacy(raw)) if raw.trim().is_empty() => None,
        Some(Wire::Legacy(raw)) => match serde_json::from_str::<PayStub>(&raw) {
            Ok(stub) => Some(stub),
            Err(_) if raw.starts_with("data:image") => Some(PayStub {
                data_url: raw,
                compressed: None,
                filename: "paystub.jpg".to_string(),
                size: 0,
            }),
            Err(_) => None,
        },
        None => None,
    })
}
