use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{de, ApiError, GlesysClient};

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct EmailAccount {
    #[serde(deserialize_with = "de::string")]
    pub emailaccount: String,
    #[serde(default, deserialize_with = "de::string")]
    pub displayname: String,
    #[serde(default, deserialize_with = "de::int")]
    pub antispamlevel: i64,
    #[serde(default, deserialize_with = "de::string")]
    pub antivirus: String,
    #[serde(default, deserialize_with = "de::string")]
    pub autorespond: String,
    #[serde(default, deserialize_with = "de::string")]
    pub autorespondmessage: String,
    #[serde(default, deserialize_with = "de::string")]
    pub autorespondsaveemail: String,
    #[serde(default, deserialize_with = "de::string")]
    pub rejectspam: String,
    #[serde(default, deserialize_with = "de::int")]
    pub quotaingib: i64,
    #[serde(default, deserialize_with = "de::string")]
    pub created: String,
    #[serde(default, deserialize_with = "de::string")]
    pub modified: String,
    /// Only present in the reply to `email/createaccount`.
    #[serde(default, deserialize_with = "de::string")]
    pub password: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct EmailAlias {
    #[serde(deserialize_with = "de::string")]
    pub emailalias: String,
    #[serde(default, rename = "goto", deserialize_with = "de::string")]
    pub destination: String,
}

/// Accounts and aliases of one email domain.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct EmailList {
    #[serde(default)]
    pub emailaccounts: Vec<EmailAccount>,
    #[serde(default)]
    pub emailaliases: Vec<EmailAlias>,
}

/// Parameters for `email/createaccount` and `email/editaccount`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EmailAccountParams {
    pub emailaccount: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub antispamlevel: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub antivirus: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub autorespond: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub autorespondmessage: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quotaingib: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejectspam: Option<String>,
}

/// The domain part of an email address.
pub fn email_domain(address: &str) -> Result<&str, ApiError> {
    match address.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(domain),
        _ => Err(ApiError::InvalidRequest(format!(
            "'{}' is not an email address",
            address
        ))),
    }
}

/// The `email` API module.
pub struct EmailDomains<'a> {
    pub(super) client: &'a GlesysClient,
}

impl EmailDomains<'_> {
    /// Accounts and aliases of the domain of `address`, filtered on `address`.
    pub async fn list(&self, address: &str) -> Result<EmailList, ApiError> {
        let domain = email_domain(address)?;
        self.client
            .call(
                "email/list",
                &json!({ "domainname": domain, "filter": address }),
                "list",
            )
            .await
    }

    pub async fn create_account(&self, params: &EmailAccountParams) -> Result<EmailAccount, ApiError> {
        self.client.call("email/createaccount", params, "emailaccount").await
    }

    pub async fn edit_account(&self, params: &EmailAccountParams) -> Result<EmailAccount, ApiError> {
        self.client.call("email/editaccount", params, "emailaccount").await
    }

    pub async fn create_alias(&self, alias: &str, destination: &str) -> Result<EmailAlias, ApiError> {
        self.client
            .call(
                "email/createalias",
                &json!({ "emailalias": alias, "goto": destination }),
                "emailalias",
            )
            .await
    }

    pub async fn edit_alias(&self, alias: &str, destination: &str) -> Result<EmailAlias, ApiError> {
        self.client
            .call(
                "email/editalias",
                &json!({ "emailalias": alias, "goto": destination }),
                "emailalias",
            )
            .await
    }

    /// Delete an account or an alias.
    pub async fn delete(&self, address: &str) -> Result<(), ApiError> {
        self.client.exec("email/delete", &json!({ "email": address })).await
    }
}
