//! Account endpoints: available models and balance.

use serde::{Deserialize, Serialize};

/// Response of the model listing endpoint.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModelList {
    /// Available models.
    pub data: Vec<ModelInfo>,
}

/// One entry of a [`ModelList`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    /// Identifier to put in [`Request::model`].
    ///
    /// [`Request::model`]: crate::Request::model
    pub id: String,
    /// Organization owning the model.
    #[serde(default)]
    pub owned_by: String,
}

/// Response of the balance endpoint.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Balance {
    /// Whether the balance is sufficient for API calls.
    pub is_available: bool,
    /// One entry per currency.
    #[serde(default)]
    pub balance_infos: Vec<BalanceInfo>,
}

/// Balance in one currency. Amounts are decimal strings as sent by the API.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BalanceInfo {
    /// `CNY` or `USD`.
    pub currency: String,
    /// Granted plus topped up balance.
    pub total_balance: String,
    /// Unexpired granted balance.
    #[serde(default)]
    pub granted_balance: String,
    /// Topped up balance.
    #[serde(default)]
    pub topped_up_balance: String,
}

impl std::fmt::Display for Balance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "available: {}",
            if self.is_available { "yes" } else { "no" }
        )?;
        for info in &self.balance_infos {
            write!(
                f,
                "\n{} total {} (granted {}, topped up {})",
                info.currency,
                info.total_balance,
                info.granted_balance,
                info.topped_up_balance
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_list() {
        let list: ModelList = serde_json::from_str(
            r#"{"object":"list","data":[{"id":"deepseek-chat","object":"model","owned_by":"deepseek"},{"id":"deepseek-reasoner","object":"model","owned_by":"deepseek"}]}"#,
        )
        .unwrap();
        let ids: Vec<&str> = list.data.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, ["deepseek-chat", "deepseek-reasoner"]);
    }

    #[test]
    fn test_balance_display() {
        let balance: Balance = serde_json::from_str(
            r#"{"is_available":true,"balance_infos":[{"currency":"CNY","total_balance":"110.00","granted_balance":"10.00","topped_up_balance":"100.00"}]}"#,
        )
        .unwrap();
        assert_eq!(
            balance.to_string(),
            "available: yes\nCNY total 110.00 (granted 10.00, topped up 100.00)"
        );
    }
}
