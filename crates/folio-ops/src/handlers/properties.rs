// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! `properties` feature-area

use crate::context::OperationContext;
use crate::error::{HandlerError, HandlerResult};
use crate::finalize::HandlerOutput;
use crate::params::OperationParameters;
use crate::registry::{ArgumentSpec, OperationHandler};
use folio_api_contract::ArgumentType;
use std::sync::Arc;

pub fn handlers() -> Vec<Arc<dyn OperationHandler>> {
    vec![Arc::new(Get), Arc::new(Set), Arc::new(RemoveCustom)]
}

/// Property names with a dedicated field
const CORE: [&str; 5] = ["title", "author", "subject", "keywords", "modified_at"];

pub struct Get;

impl OperationHandler for Get {
    fn name(&self) -> &'static str {
        "get"
    }

    fn description(&self) -> &'static str {
        "Core and custom properties"
    }

    fn read_only(&self) -> bool {
        true
    }

    fn execute(&self, ctx: &mut OperationContext, _params: &OperationParameters) -> HandlerResult {
        HandlerOutput::structured(&ctx.document().properties)
    }
}

pub struct Set;

const SET_ARGS: &[ArgumentSpec] = &[
    ArgumentSpec::required(
        "name",
        ArgumentType::String,
        "title, author, subject, keywords or any custom name",
    ),
    ArgumentSpec::required(
        "value",
        ArgumentType::String,
        "New value; keywords are comma separated",
    ),
];

impl OperationHandler for Set {
    fn name(&self) -> &'static str {
        "set"
    }

    fn description(&self) -> &'static str {
        "Set a core or custom property"
    }

    fn arguments(&self) -> &'static [ArgumentSpec] {
        SET_ARGS
    }

    fn execute(&self, ctx: &mut OperationContext, params: &OperationParameters) -> HandlerResult {
        let name: String = params.required("name")?;
        if name.trim().is_empty() {
            return Err(HandlerError::invalid("name", "property name must not be blank"));
        }
        let value: String = params.required("value")?;
        ctx.edit(|doc| doc.set_property(&name, Some(value)))?;
        Ok(HandlerOutput::message(format!("Property '{}' set", name)))
    }
}

pub struct RemoveCustom;

const REMOVE_ARGS: &[ArgumentSpec] = &[ArgumentSpec::required(
    "name",
    ArgumentType::String,
    "Custom property name",
)];

impl OperationHandler for RemoveCustom {
    fn name(&self) -> &'static str {
        "remove_custom"
    }

    fn description(&self) -> &'static str {
        "Delete a custom property"
    }

    fn arguments(&self) -> &'static [ArgumentSpec] {
        REMOVE_ARGS
    }

    fn execute(&self, ctx: &mut OperationContext, params: &OperationParameters) -> HandlerResult {
        let name: String = params.required("name")?;
        if CORE.contains(&name.as_str()) {
            return Err(HandlerError::invalid(
                "name",
                format!("'{}' is a core property, not a custom one", name),
            ));
        }
        if !ctx.document().properties.custom.contains_key(&name) {
            return Err(HandlerError::Failed(format!(
                "Custom property '{}' not found",
                name
            )));
        }
        ctx.edit(|doc| doc.set_property(&name, None))?;
        Ok(HandlerOutput::message(format!("Custom property '{}' removed", name)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::testing::Harness;
    use folio_document::Document;

    #[tokio::test]
    async fn set_core_and_custom() {
        let mut h = Harness::new(Document::new()).await;
        h.run(&Set, OperationParameters::new().with("name", "title").with("value", "Plan"))
            .unwrap();
        h.run(
            &Set,
            OperationParameters::new().with("name", "keywords").with("value", "a, b"),
        )
        .unwrap();
        h.run(&Set, OperationParameters::new().with("name", "team").with("value", "infra"))
            .unwrap();
        let props = &h.document().properties;
        assert_eq!(props.title.as_deref(), Some("Plan"));
        assert_eq!(props.keywords, vec!["a", "b"]);
        assert_eq!(props.custom.get("team").map(String::as_str), Some("infra"));
    }

    #[tokio::test]
    async fn remove_custom_rules() {
        let mut h = Harness::new(Document::new()).await;
        let err = h
            .run(&RemoveCustom, OperationParameters::new().with("name", "title"))
            .unwrap_err();
        assert!(matches!(err, HandlerError::InvalidParameter { .. }));

        let err = h
            .run(&RemoveCustom, OperationParameters::new().with("name", "team"))
            .unwrap_err();
        assert!(matches!(err, HandlerError::Failed(_)));
        assert!(!h.ctx.is_modified());

        h.run(&Set, OperationParameters::new().with("name", "team").with("value", "x"))
            .unwrap();
        h.run(&RemoveCustom, OperationParameters::new().with("name", "team"))
            .unwrap();
        assert!(h.document().properties.custom.is_empty());
    }

    #[tokio::test]
    async fn modified_at_is_not_settable() {
        let mut h = Harness::new(Document::new()).await;
        let err = h
            .run(
                &Set,
                OperationParameters::new().with("name", "modified_at").with("value", "now"),
            )
            .unwrap_err();
        assert!(matches!(err, HandlerError::Document(_)));
    }
}
