use serde::{Deserialize, Serialize};

/// One customer row, exactly the 19 columns the churn pipeline was fit on.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct CustomerRecord {
    pub gender: String,
    #[serde(rename = "SeniorCitizen")]
    pub senior_citizen: i64,
    #[serde(rename = "Partner")]
    pub partner: String,
    #[serde(rename = "Dependents")]
    pub dependents: String,
    pub tenure: i64,
    #[serde(rename = "PhoneService")]
    pub phone_service: String,
    #[serde(rename = "MultipleLines")]
    pub multiple_lines: String,
    #[serde(rename = "InternetService")]
    pub internet_service: String,
    #[serde(rename = "OnlineSecurity")]
    pub online_security: String,
    #[serde(rename = "OnlineBackup")]
    pub online_backup: String,
    #[serde(rename = "DeviceProtection")]
    pub device_protection: String,
    #[serde(rename = "TechSupport")]
    pub tech_support: String,
    #[serde(rename = "StreamingTV")]
    pub streaming_tv: String,
    #[serde(rename = "StreamingMovies")]
    pub streaming_movies: String,
    #[serde(rename = "Contract")]
    pub contract: String,
    #[serde(rename = "PaperlessBilling")]
    pub paperless_billing: String,
    #[serde(rename = "PaymentMethod")]
    pub payment_method: String,
    #[serde(rename = "MonthlyCharges")]
    pub monthly_charges: f64,
    #[serde(rename = "TotalCharges")]
    pub total_charges: f64,
}

/// A single cell of a record, looked up by its column name.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Cell<'a> {
    Text(&'a str),
    Number(f64),
}

impl CustomerRecord {
    /// Returns the value stored under a wire column name.
    pub fn cell(&self, column: &str) -> Option<Cell<'_>> {
        let cell = match column {
            "gender" => Cell::Text(&self.gender),
            "SeniorCitizen" => Cell::Number(self.senior_citizen as f64),
            "Partner" => Cell::Text(&self.partner),
            "Dependents" => Cell::Text(&self.dependents),
            "tenure" => Cell::Number(self.tenure as f64),
            "PhoneService" => Cell::Text(&self.phone_service),
            "MultipleLines" => Cell::Text(&self.multiple_lines),
            "InternetService" => Cell::Text(&self.internet_service),
            "OnlineSecurity" => Cell::Text(&self.online_security),
            "OnlineBackup" => Cell::Text(&self.online_backup),
            "DeviceProtection" => Cell::Text(&self.device_protection),
            "TechSupport" => Cell::Text(&self.tech_support),
            "StreamingTV" => Cell::Text(&self.streaming_tv),
            "StreamingMovies" => Cell::Text(&self.streaming_movies),
            "Contract" => Cell::Text(&self.contract),
            "PaperlessBilling" => Cell::Text(&self.paperless_billing),
            "PaymentMethod" => Cell::Text(&self.payment_method),
            "MonthlyCharges" => Cell::Number(self.monthly_charges),
            "TotalCharges" => Cell::Number(self.total_charges),
            _ => return None,
        };
        Some(cell)
    }
}

#[derive(Debug, Serialize, Clone, Copy, PartialEq)]
pub struct PredictionResult {
    pub probability: f64,
    pub prediction: u8,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ThresholdResponse {
    pub threshold: f64,
}

#[derive(Debug, Serialize)]
pub struct RootResponse {
    pub message: &'static str,
}

#[cfg(test)]
pub(crate) fn sample_record() -> CustomerRecord {
    CustomerRecord {
        gender: "Female".into(),
        senior_citizen: 0,
        partner: "Yes".into(),
        dependents: "No".into(),
        tenure: 1,
        phone_service: "No".into(),
        multiple_lines: "No phone service".into(),
        internet_service: "DSL".into(),
        online_security: "No".into(),
        online_backup: "Yes".into(),
        device_protection: "No".into(),
        tech_support: "No".into(),
        streaming_tv: "No".into(),
        streaming_movies: "No".into(),
        contract: "Month-to-month".into(),
        paperless_billing: "Yes".into(),
        payment_method: "Electronic check".into(),
        monthly_charges: 20.0,
        total_charges: 20.0,
    }
}
