use std::time::Duration;

use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::Instrument;

use crate::{configuration::EmailSettings, domain::user_email::UserEmail};

// Client to interact with email service
#[derive(Clone)]
pub struct EmailClient {
    http_client: Client,
    base_url: String,
    sender: UserEmail,
    authorization_token: SecretString,
}

impl EmailClient {
    #[tracing::instrument(
        "Sending email",
        skip(self, subject, html_content, text_content)
    )]
    pub async fn send_email(
        &self,
        recipient: &UserEmail,
        subject: &str,
        html_content: &str,
        text_content: &str,
    ) -> Result<(), reqwest::Error> {
        let url = format!("{}/email", self.base_url);
        let request_body = SendEmailRequest {
            from: &self.sender.inner(),
            to: &recipient.inner(),
            subject,
            html_body: html_content,
            text_body: text_content,
        };
        self.http_client
            .post(url)
            .json(&request_body)
            .header(
                "X-Postmark-Server-Token",
                self.authorization_token.expose_secret(),
            )
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    /// Sends in the background. Failures are logged and never reach the
    /// caller, whose database work has already been committed.
    pub fn notify(&self, recipient: &str, subject: String, text_content: String) {
        let recipient = match UserEmail::parse(recipient.to_string()) {
            Ok(email) => email,
            Err(e) => {
                tracing::warn!("Skipping notification: {}", e);
                return;
            }
        };

        let client = self.clone();
        let span = tracing::info_span!("Dispatching notification", subject = %subject);

        tokio::spawn(
            async move {
                let html_content = format!("<p>{}</p>", text_content.replace('\n', "<br>"));
                if let Err(e) = client
                    .send_email(&recipient, &subject, &html_content, &text_content)
                    .await
                {
                    tracing::error!(error = %e, "Failed to send notification email");
                }
            }
            .instrument(span),
        );
    }

    // create new email client
    pub fn new(
        base_url: String,
        sender: UserEmail,
        authorization_token: SecretString,
        timeout: u64,
    ) -> Result<EmailClient, reqwest::Error> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(timeout))
            .build()?;

        Ok(Self {
            http_client,
            base_url,
            sender,
            authorization_token,
        })
    }

    pub fn from_settings(settings: &EmailSettings) -> Result<EmailClient, anyhow::Error> {
        let sender = settings.sender().map_err(|e| anyhow::anyhow!(e))?;

        Ok(EmailClient::new(
            settings.api_uri.clone(),
            sender,
            settings.authorization_token.clone(),
            settings.timeout_seconds,
        )?)
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SendEmailRequest<'a> {
    pub from: &'a str,
    pub to: &'a str,
    pub subject: &'a str,
    pub html_body: &'a str,
    pub text_body: &'a str,
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use claim::{assert_err, assert_ok};
    use fake::{
        faker::{
            internet::en::SafeEmail,
            lorem::en::{Paragraph, Sentence},
        },
        Fake, Faker,
    };
    use secrecy::SecretString;
    use wiremock::{
        matchers::{any, header, header_exists, method, path},
        Mock, MockServer, ResponseTemplate,
    };

    use super::EmailClient;
    use crate::domain::user_email::UserEmail;

    fn subject() -> String {
        Sentence(1..2).fake()
    }

    fn content() -> String {
        Paragraph(1..10).fake()
    }

    fn email() -> UserEmail {
        UserEmail::parse(SafeEmail().fake()).unwrap()
    }

    fn email_client(base_url: String) -> EmailClient {
        let key = Faker.fake::<String>();
        EmailClient::new(base_url, email(), SecretString::new(key.into()), 3).unwrap()
    }

    struct SendEmailBodyMatcher;
    impl wiremock::Match for SendEmailBodyMatcher {
        fn matches(&self, request: &wiremock::Request) -> bool {
            let result: Result<serde_json::Value, _> = serde_json::from_slice(&request.body);

            if let Ok(body) = result {
                body.get("From").is_some()
                    && body.get("To").is_some()
                    && body.get("Subject").is_some()
                    && body.get("HtmlBody").is_some()
                    && body.get("TextBody").is_some()
            } else {
                false
            }
        }
    }

    #[actix_web::test]
    async fn send_email_succeeds_if_the_server_returns_200() {
        let mock_server = MockServer::start().await;
        let email_client = email_client(mock_server.uri());

        Mock::given(header_exists("X-Postmark-Server-Token"))
            .and(header("Content-Type", "application/json"))
            .and(path("/email"))
            .and(method("POST"))
            .and(SendEmailBodyMatcher)
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&mock_server)
            .await;

        let outcome = email_client
            .send_email(&email(), &subject(), &content(), &content())
            .await;
        assert_ok!(outcome)
    }

    #[actix_web::test]
    async fn send_email_fails_if_the_server_returns_500() {
        let mock_server = MockServer::start().await;
        let email_client = email_client(mock_server.uri());

        Mock::given(any())
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&mock_server)
            .await;

        let outcome = email_client
            .send_email(&email(), &subject(), &content(), &content())
            .await;
        assert_err!(outcome);
    }

    #[actix_web::test]
    async fn notify_sends_in_the_background() {
        let mock_server = MockServer::start().await;
        let email_client = email_client(mock_server.uri());

        Mock::given(path("/email"))
            .and(SendEmailBodyMatcher)
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&mock_server)
            .await;

        email_client.notify("owner@foodflex.ma", subject(), content());

        for _ in 0..50 {
            if !mock_server.received_requests().await.unwrap_or_default().is_empty() {
                break;
            }
            actix_web::rt::time::sleep(Duration::from_millis(20)).await;
        }
    }

    #[actix_web::test]
    async fn notify_ignores_server_errors() {
        let mock_server = MockServer::start().await;
        let email_client = email_client(mock_server.uri());

        Mock::given(any())
            .respond_with(ResponseTemplate::new(500))
            .mount(&mock_server)
            .await;

        email_client.notify("owner@foodflex.ma", subject(), content());
        email_client.notify("not-an-email", subject(), content());
    }

    #[actix_web::test]
    async fn send_email_times_out_if_server_takes_too_long() {
        let mock_server = MockServer::start().await;
        let email_client = email_client(mock_server.uri());

        Mock::given(any())
            .respond_with(ResponseTemplate::new(500).set_delay(Duration::from_secs(180)))
            .expect(1)
            .mount(&mock_server)
            .await;

        let outcome = email_client
            .send_email(&email(), &subject(), &content(), &content())
            .await;
        assert_err!(outcome);
    }
}
