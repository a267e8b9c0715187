use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use std::fmt::Debug;
use url::Url;

use crate::serde::{SerdePathError, SerdeResponseParseAsync};

#[derive(Debug)]
pub enum ReqwestStage {
    Send,
    Status,
    DecodeText,
    Deserialise,
}

fn parse_url<U: ToString>(url: U) -> crate::Result<Url> {
    url.to_string()
        .parse::<Url>()
        .map_err(|_| crate::Error::InvalidUrl(url.to_string()))
}

/// Request details kept around for error messages. Secrets passed through
/// [`Reqwest::secret_query`] never end up in here.
#[derive(Debug)]
#[allow(dead_code)]
pub struct ReqwestErrorContext {
    pub url: Url,
    query: String,
}

#[derive(Debug)]
pub enum ReqwestInnerError {
    Reqwest(reqwest::Error),
    SerdePath(SerdePathError),
}

impl ReqwestInnerError {
    pub fn is_connect(&self) -> bool {
        match self {
            Self::Reqwest(err) => err.is_connect() || err.is_timeout(),
            Self::SerdePath(_) => false,
        }
    }
}

/// Thin wrapper over a `reqwest` request that reports which stage of the
/// request failed along with the URL and the query it was sent with.
pub struct Reqwest {
    builder: RequestBuilder,
    error_context: Option<ReqwestErrorContext>,
}

impl Reqwest {
    pub fn get<U: ToString>(client: &Client, url: U) -> crate::Result<Self> {
        let url = parse_url(url)?;
        let builder = client.get(url.clone());
        Ok(Self {
            builder,
            error_context: Some(ReqwestErrorContext {
                url,
                query: String::new(),
            }),
        })
    }

    pub fn query<T: serde::Serialize + Debug>(mut self, query: &T) -> Self {
        self.builder = self.builder.query(query);
        if let Some(context) = self.error_context.as_mut() {
            context.query.push_str(&format!("{query:?}"));
        }
        self
    }

    /// Same as [`Reqwest::query`] but keeps the pairs out of error messages.
    pub fn secret_query<T: serde::Serialize>(mut self, query: &T) -> Self {
        self.builder = self.builder.query(query);
        self
    }

    async fn receive_text_internal(mut self) -> crate::Result<(String, Box<ReqwestErrorContext>)> {
        let error_context = Box::new(
            self.error_context
                .take()
                .ok_or(crate::Error::ReqwestErrorContextMissing)?,
        );

        let send_result = self.builder.send().await;
        let response = match send_result {
            Ok(response) => response,
            Err(err) if err.is_connect() => {
                return Err(crate::Error::Internet(error_context.url));
            }
            Err(err) => {
                return Err(crate::Error::ReqwestFailed {
                    stage: ReqwestStage::Send,
                    context: error_context,
                    inner: ReqwestInnerError::Reqwest(err.without_url()),
                });
            }
        };

        if response.status() == StatusCode::TOO_MANY_REQUESTS {
            return Err(crate::Error::RateLimited(format!(
                "HTTP 429 from {}",
                error_context.url
            )));
        }

        let response = match response.error_for_status() {
            Ok(response) => response,
            Err(err) => {
                return Err(crate::Error::ReqwestFailed {
                    stage: ReqwestStage::Status,
                    context: error_context,
                    inner: ReqwestInnerError::Reqwest(err.without_url()),
                });
            }
        };

        let text = match response.text().await {
            Ok(text) => text,
            Err(err) => {
                return Err(crate::Error::ReqwestFailed {
                    stage: ReqwestStage::DecodeText,
                    context: error_context,
                    inner: ReqwestInnerError::Reqwest(err.without_url()),
                });
            }
        };

        Ok((text, error_context))
    }

    pub async fn receive_json<J: Debug + DeserializeOwned>(self) -> crate::Result<J> {
        let (text, error_context) = self.receive_text_internal().await?;

        let parse_result = text.as_str().serde_parse_custom().await;
        let Ok(json) = parse_result else {
            let err = parse_result.unwrap_err();
            return Err(crate::Error::ReqwestFailed {
                stage: ReqwestStage::Deserialise,
                context: error_context,
                inner: ReqwestInnerError::SerdePath(err),
            });
        };
        Ok(json)
    }
}
