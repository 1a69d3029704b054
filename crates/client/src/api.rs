use anyhow::bail;
use pollboard_core::{
    BoardStats, NewPoll, Poll, PollPage, PollWithOptions, StoreError, Vote, VoteRecord, VoteStore,
    VoterIdentity,
};
use uuid::Uuid;

pub struct Api {
    pub http: reqwest::Client,
    pub base_url: String,
    pub token: Option<String>,
}

impl Api {
    pub fn new(base_url: String, token: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url,
            token,
        }
    }

    fn auth(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    pub async fn me(&self) -> anyhow::Result<String> {
        let response = self
            .auth(self.http.get(format!("{}/me", self.base_url)))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await?;
            bail!("API error ({}): {}", status, text);
        }

        let body: serde_json::Value = response.json().await?;
        Ok(body["user_id"].as_str().unwrap_or_default().to_string())
    }

    pub async fn list_polls(&self, search: &str, page: i64) -> anyhow::Result<PollPage> {
        let response = self
            .auth(self.http.get(format!("{}/polls", self.base_url)))
            .query(&[
                ("search", search.to_string()),
                ("page", page.to_string()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await?;
            bail!("API error ({}): {}", status, text);
        }

        Ok(response.json().await?)
    }

    pub async fn get_poll(&self, poll_id: Uuid) -> anyhow::Result<PollWithOptions> {
        let response = self
            .auth(self.http.get(format!("{}/polls/{poll_id}", self.base_url)))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await?;
            bail!("API error ({}): {}", status, text);
        }

        Ok(response.json().await?)
    }

    pub async fn create_poll(&self, draft: &NewPoll) -> anyhow::Result<Poll> {
        let response = self
            .auth(self.http.post(format!("{}/polls", self.base_url)))
            .json(draft)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await?;
            bail!("Poll creation failed ({}): {}", status, text);
        }

        Ok(response.json().await?)
    }

    pub async fn delete_poll(&self, poll_id: Uuid) -> anyhow::Result<()> {
        let response = self
            .auth(self.http.delete(format!("{}/polls/{poll_id}", self.base_url)))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await?;
            bail!("Poll deletion failed ({}): {}", status, text);
        }

        Ok(())
    }

    pub async fn board_stats(&self) -> anyhow::Result<BoardStats> {
        let response = self
            .http
            .get(format!("{}/polls/stats", self.base_url))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await?;
            bail!("API error ({}): {}", status, text);
        }

        Ok(response.json().await?)
    }
}

/// HTTP-backed vote store: one POST per selected option.
pub struct ApiVoteStore<'a> {
    pub api: &'a Api,
}

impl VoteStore for ApiVoteStore<'_> {
    async fn submit_vote(&self, record: &VoteRecord) -> Result<Vote, StoreError> {
        let url = format!("{}/polls/{}/vote", self.api.base_url, record.poll_id);
        let mut request = self.api.http.post(&url);

        let body = match &record.voter {
            VoterIdentity::Authenticated { .. } => {
                if let Some(token) = &self.api.token {
                    request = request.bearer_auth(token);
                }
                serde_json::json!({ "option_id": record.option_id })
            }
            VoterIdentity::Anonymous { name, email } => serde_json::json!({
                "option_id": record.option_id,
                "voter_name": name,
                "voter_email": email,
            }),
        };

        let response = request
            .json(&body)
            .send()
            .await
            .map_err(|err| StoreError::new(err.to_string()))?;

        if !response.status().is_success() {
            // The server answers errors with a plain-text message.
            let message = response.text().await.unwrap_or_default();
            return Err(StoreError::new(message));
        }

        response
            .json::<Vote>()
            .await
            .map_err(|err| StoreError::new(err.to_string()))
    }
}
