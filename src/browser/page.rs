use super::{ButtonInfo, PageDom, PanelEvents, js_templates};
use crate::actor::panel::{PanelAction, PanelView};
use crate::{Result, SignInError};
use async_trait::async_trait;
use chromiumoxide::Page;
use chromiumoxide::cdp::js_protocol::runtime::{AddBindingParams, EventBindingCalled};
use futures::StreamExt;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::mpsc;

/// [`PageDom`] over a CDP page.
pub struct CdpPage {
    page: Arc<Page>,
}

impl CdpPage {
    pub fn new(page: Arc<Page>) -> Self {
        Self { page }
    }

    async fn eval<T: DeserializeOwned>(&self, script: &str) -> Result<T> {
        let result = self
            .page
            .evaluate(script)
            .await
            .map_err(|e| SignInError::EvaluationError(e.to_string()))?;

        result
            .into_value::<T>()
            .map_err(|e| SignInError::EvaluationError(format!("Unexpected result: {}", e)))
    }

    async fn listen_panel_actions(&self) -> Result<PanelEvents> {
        self.page
            .execute(AddBindingParams::new(js_templates::BINDING_NAME))
            .await
            .map_err(|e| SignInError::EvaluationError(format!("Failed to add binding: {}", e)))?;

        let mut stream = self
            .page
            .event_listener::<EventBindingCalled>()
            .await
            .map_err(|e| {
                SignInError::EvaluationError(format!("Failed to attach binding listener: {}", e))
            })?;

        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(async move {
            while let Some(event) = stream.next().await {
                if event.name != js_templates::BINDING_NAME {
                    continue;
                }
                match PanelAction::parse(&event.payload) {
                    Some(action) => {
                        if tx.send(action).is_err() {
                            break;
                        }
                    }
                    None => tracing::debug!("Ignoring panel payload: {}", event.payload),
                }
            }
        });

        Ok(rx)
    }
}

#[async_trait]
impl PageDom for CdpPage {
    async fn url(&self) -> Result<String> {
        self.page
            .url()
            .await
            .map_err(|e| SignInError::EvaluationError(e.to_string()))
            .map(Option::unwrap_or_default)
    }

    async fn document_id(&self) -> Result<String> {
        self.eval(js_templates::DOCUMENT_ID).await
    }

    async fn exists(&self, selector: &str) -> Result<bool> {
        self.eval(&js_templates::element_exists(selector)).await
    }

    async fn click(&self, selector: &str) -> Result<bool> {
        let result: Value = self.eval(&js_templates::click_element(selector)).await?;
        Ok(result
            .get("found")
            .and_then(|v| v.as_bool())
            .unwrap_or(false))
    }

    async fn body_text(&self) -> Result<String> {
        self.eval(js_templates::BODY_TEXT).await
    }

    async fn list_buttons(&self, highlight: bool) -> Result<Vec<ButtonInfo>> {
        self.eval(&js_templates::list_buttons(highlight)).await
    }

    async fn show_panel(&self, view: &PanelView) -> Result<PanelEvents> {
        let events = self.listen_panel_actions().await?;
        let rows = serde_json::to_string(&view.rows())?;
        let created: bool = self.eval(&js_templates::show_panel(&rows)).await?;
        if !created {
            tracing::debug!("Debug panel already present, not creating another");
        }
        Ok(events)
    }

    async fn update_panel(&self, view: &PanelView) -> Result<()> {
        let rows = serde_json::to_string(&view.rows())?;
        let _: bool = self.eval(&js_templates::update_panel(&rows)).await?;
        Ok(())
    }
}
