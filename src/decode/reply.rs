//! Reply decoding: request bodies to bound arguments.
//!
//! The root of a reply is a JSON array of arguments. Form-encoded replies carry that
//! array in field `0` and may point at other fields through `$`-prefixed references:
//!
//! | Value      | Meaning                                                  |
//! |------------|----------------------------------------------------------|
//! | `$$text`   | the literal string `$text`                               |
//! | `$K<id>`   | a form argument built from fields `<id>_*`               |
//! | `$F<id>`   | a server reference stored as JSON in field `<id>`        |
//!
//! References are resolved for top-level arguments only.

use serde::Deserialize;
use serde_json::Value as JsonValue;

use crate::actions::args::{ActionArg, BoundAction, BoundArguments};
use crate::actions::manifest::WorkerScope;
use crate::actions::registry::ActionResolver;
use crate::decode::form::FormData;
use crate::error::ActionError;

/// Form field holding the root of a form-encoded reply.
pub const ROOT_FIELD: &str = "0";

/// Field-name prefix of the action id in a plain form submission.
pub const ACTION_ID_FIELD_PREFIX: &str = "$ACTION_ID_";

/// Prefix shared by every framework-internal form field.
pub const ACTION_FIELD_PREFIX: &str = "$ACTION_";

/// Resolves server references back into callables for one worker scope.
#[derive(Debug, Clone, Copy)]
pub struct ModuleMap<'a> {
    resolver: &'a ActionResolver,
    scope: &'a WorkerScope,
}

impl<'a> ModuleMap<'a> {
    pub fn new(resolver: &'a ActionResolver, scope: &'a WorkerScope) -> Self {
        Self { resolver, scope }
    }

    fn bind(&self, id: &str, bound: BoundArguments) -> Result<BoundAction, ActionError> {
        let handler = self.resolver.resolve(id, self.scope)?;
        Ok(BoundAction::new(id, handler, bound))
    }
}

#[derive(Debug, Deserialize)]
struct ServerReference {
    id: String,
    #[serde(default)]
    bound: Option<Vec<JsonValue>>,
}

/// Decode a structured (text) reply.
pub fn decode_reply_text(text: &str, modules: ModuleMap<'_>) -> Result<BoundArguments, ActionError> {
    let root = parse_root(text)?;
    decode_arguments(root, None, modules)
}

/// Decode a form-encoded reply (URL-encoded or multipart).
pub fn decode_reply_form(form: &FormData, modules: ModuleMap<'_>) -> Result<BoundArguments, ActionError> {
    let text = form
        .get_text(ROOT_FIELD)
        .ok_or_else(|| ActionError::malformed("form reply is missing its root field"))?;
    let root = parse_root(text)?;
    decode_arguments(root, Some(form), modules)
}

/// Decode a plain form submission into the action it names, with the form bound as its
/// only argument. `None` when the form does not name an action.
pub fn decode_action(form: &FormData, modules: ModuleMap<'_>) -> Result<Option<BoundAction>, ActionError> {
    let Some(action_id) = form
        .iter()
        .find_map(|(name, _)| name.strip_prefix(ACTION_ID_FIELD_PREFIX))
    else {
        return Ok(None);
    };

    let bound = form.filter(|name| !name.starts_with(ACTION_FIELD_PREFIX));
    modules
        .bind(action_id, vec![ActionArg::Form(bound)])
        .map(Some)
}

fn parse_root(text: &str) -> Result<Vec<JsonValue>, ActionError> {
    match serde_json::from_str(text) {
        Ok(JsonValue::Array(values)) => Ok(values),
        Ok(_) => Err(ActionError::malformed("reply root must be an array")),
        Err(err) => Err(ActionError::malformed(format!("reply is not valid JSON: {err}"))),
    }
}

fn decode_arguments(
    values: Vec<JsonValue>,
    form: Option<&FormData>,
    modules: ModuleMap<'_>,
) -> Result<BoundArguments, ActionError> {
    values
        .into_iter()
        .map(|value| decode_argument(value, form, modules))
        .collect()
}

fn decode_argument(value: JsonValue, form: Option<&FormData>, modules: ModuleMap<'_>) -> Result<ActionArg, ActionError> {
    let JsonValue::String(text) = value else {
        return Ok(ActionArg::Json(unescape(value)));
    };
    if !text.starts_with('$') {
        return Ok(ActionArg::Json(JsonValue::String(text)));
    }
    let reference = &text[1..];

    if reference.starts_with('$') {
        return Ok(ActionArg::Json(JsonValue::String(reference.to_string())));
    }

    let form = form.ok_or_else(|| {
        ActionError::malformed(format!("reference {text:?} requires a form-encoded reply"))
    })?;

    if let Some(id) = reference.strip_prefix('K') {
        return Ok(ActionArg::Form(form.strip_prefix(&format!("{id}_"))));
    }

    if let Some(id) = reference.strip_prefix('F') {
        let raw = form
            .get_text(id)
            .ok_or_else(|| ActionError::malformed(format!("server reference field {id:?} is missing")))?;
        let server_ref: ServerReference = serde_json::from_str(raw)
            .map_err(|err| ActionError::malformed(format!("invalid server reference: {err}")))?;
        let bound = decode_arguments(server_ref.bound.unwrap_or_default(), Some(form), modules)?;
        return modules.bind(&server_ref.id, bound).map(ActionArg::Action);
    }

    Err(ActionError::malformed(format!("unknown reference {text:?}")))
}

/// Remove one escaping `$` from nested `$$` strings.
fn unescape(value: JsonValue) -> JsonValue {
    match value {
        JsonValue::String(text) => match text.strip_prefix("$$") {
            Some(rest) => JsonValue::String(format!("${rest}")),
            None => JsonValue::String(text),
        },
        JsonValue::Array(values) => JsonValue::Array(values.into_iter().map(unescape).collect()),
        JsonValue::Object(map) => {
            JsonValue::Object(map.into_iter().map(|(k, v)| (k, unescape(v))).collect())
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::actions::args::BoundArguments;
    use crate::actions::handler::ActionReturn;
    use crate::actions::manifest::ActionManifest;
    use crate::actions::registry::ModuleRegistry;
    use crate::config::Runtime;
    use crate::decode::multipart::MultipartParser;
    use crate::store::RequestStore;
    use futures_util::future::BoxFuture;
    use serde_json::json;

    fn noop<'a>(_store: &'a mut RequestStore, _args: BoundArguments) -> BoxFuture<'a, ActionReturn> {
        Box::pin(async { Ok(JsonValue::Null) })
    }

    fn fixture() -> (ActionResolver, WorkerScope) {
        let scope = WorkerScope::for_page(Runtime::Node, "/");
        let mut manifest = ActionManifest::new();
        manifest.insert("save", &scope, "mod-a");
        let modules = ModuleRegistry::new();
        modules.register("mod-a", "save", noop);
        (ActionResolver::new(Arc::new(manifest), Arc::new(modules)), scope)
    }

    #[test]
    fn test_same_arguments_across_encodings() {
        let (resolver, scope) = fixture();
        let modules = ModuleMap::new(&resolver, &scope);
        let root = json!([1, "plain", "$$cash", { "note": "$$x", "n": [true, null] }]).to_string();

        let from_text = decode_reply_text(&root, modules).unwrap();

        let urlencoded: String = form_urlencoded::Serializer::new(String::new())
            .append_pair(ROOT_FIELD, &root)
            .finish();
        let from_urlencoded = decode_reply_form(&FormData::from_urlencoded(urlencoded.as_bytes()), modules).unwrap();

        let multipart = format!(
            "--b\r\nContent-Disposition: form-data; name=\"0\"\r\n\r\n{root}\r\n--b--\r\n"
        );
        let mut parser = MultipartParser::new("b");
        parser.push(multipart.as_bytes()).unwrap();
        let from_multipart = decode_reply_form(&parser.finish().unwrap(), modules).unwrap();

        let expected: BoundArguments = vec![
            json!(1).into(),
            json!("plain").into(),
            json!("$cash").into(),
            json!({ "note": "$x", "n": [true, null] }).into(),
        ];
        assert_eq!(from_text, expected);
        assert_eq!(from_urlencoded, expected);
        assert_eq!(from_multipart, expected);
    }

    #[test]
    fn test_form_and_server_references() {
        let (resolver, scope) = fixture();
        let modules = ModuleMap::new(&resolver, &scope);

        let mut form = FormData::new();
        form.append_text(ROOT_FIELD, json!(["$K1", "$F2"]).to_string());
        form.append_text("1_title", "hello");
        form.append_text("1_body", "world");
        form.append_text("2", json!({ "id": "save", "bound": ["$$a", 5] }).to_string());

        let args = decode_reply_form(&form, modules).unwrap();
        assert_eq!(args.len(), 2);

        let fields = args[0].as_form().unwrap();
        assert_eq!(fields.len(), 2);
        assert_eq!(fields.get_text("title"), Some("hello"));

        match &args[1] {
            ActionArg::Action(action) => {
                assert_eq!(action.id(), "save");
                assert_eq!(
                    action.bound(),
                    [ActionArg::from(json!("$a")), ActionArg::from(json!(5))]
                );
            }
            other => panic!("expected bound action, got {other:?}"),
        }
    }

    #[test]
    fn test_malformed_replies() {
        let (resolver, scope) = fixture();
        let modules = ModuleMap::new(&resolver, &scope);

        for text in ["{}", "not json", r#"["$Q1"]"#, r#"["$K1"]"#] {
            assert!(
                matches!(decode_reply_text(text, modules), Err(ActionError::MalformedPayload(_))),
                "{text}"
            );
        }
        assert!(decode_reply_form(&FormData::new(), modules).is_err());
    }

    #[test]
    fn test_unknown_server_reference_is_unknown_action() {
        let (resolver, scope) = fixture();
        let mut form = FormData::new();
        form.append_text(ROOT_FIELD, r#"["$F1"]"#);
        form.append_text("1", r#"{"id":"gone","bound":null}"#);

        let err = decode_reply_form(&form, ModuleMap::new(&resolver, &scope)).unwrap_err();
        assert!(matches!(err, ActionError::UnknownAction { .. }));
    }

    #[test]
    fn test_decode_action_from_plain_form() {
        let (resolver, scope) = fixture();
        let modules = ModuleMap::new(&resolver, &scope);

        let mut form = FormData::new();
        form.append_text("$ACTION_ID_save", "");
        form.append_text("$ACTION_REF_1", "");
        form.append_text("title", "hi");

        let action = decode_action(&form, modules).unwrap().unwrap();
        assert_eq!(action.id(), "save");
        let bound = action.bound()[0].as_form().unwrap();
        assert_eq!(bound.len(), 1);
        assert_eq!(bound.get_text("title"), Some("hi"));

        let mut plain = FormData::new();
        plain.append_text("title", "hi");
        assert!(decode_action(&plain, modules).unwrap().is_none());
    }
}
