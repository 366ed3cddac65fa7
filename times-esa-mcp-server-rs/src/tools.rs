use chrono::{DateTime, Local};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::warn;

use crate::error::WorkflowError;
use crate::journal::JournalStore;
use crate::mcp::McpServer;
use crate::utils::normalize_tags;
use crate::workflow::{ReportRequest, ReportWorkflow};

pub const TOOL_NAME: &str = "times-esa";
pub const PROMPT_QUICK_POST: &str = "quick-post";
const PROMPT_PLACEHOLDER: &str = "内容を入力してください";

pub fn register_tools<S>(server: &mut McpServer, workflow: Arc<ReportWorkflow<S>>)
where
    S: JournalStore + 'static,
{
    let require_confirmation = workflow.options().require_confirmation;
    let mut required = vec!["text"];
    if require_confirmation {
        required.push("confirmed_by_user");
    }
    server.register_tool(
        TOOL_NAME,
        "times-esaに日報を投稿します",
        json!({
            "type": "object",
            "properties": {
                "text": { "type": "string", "description": "投稿するテキスト内容" },
                "confirmed_by_user": {
                    "type": "boolean",
                    "description": "ユーザーが投稿内容を確認済みの場合のみ true"
                },
                "tags": { "type": "array", "items": { "type": "string" } }
            },
            "required": required
        }),
        Box::new(move |args: Value| {
            let request = parse_report_args(&args, Local::now()).map_err(|err| err.to_string())?;
            let response = workflow.submit(request).map_err(|err| {
                warn!("[{TOOL_NAME}] {err}");
                err.to_string()
            })?;
            let payload = serde_json::to_value(&response)
                .map_err(|err| format!("failed to serialize response: {err}"))?;
            Ok(structured_response(payload))
        }),
    );
}

pub fn register_prompts(server: &mut McpServer) {
    server.register_prompt(
        PROMPT_QUICK_POST,
        "times_esaへの素早い投稿",
        json!([
            { "name": "text", "description": "投稿するテキスト内容", "required": false }
        ]),
        Box::new(|args: &Value| {
            let text = args
                .get("text")
                .and_then(|v| v.as_str())
                .filter(|v| !v.is_empty())
                .unwrap_or(PROMPT_PLACEHOLDER);
            json!([{
                "role": "user",
                "content": {
                    "type": "text",
                    "text": format!("以下の内容をtimes_esaに投稿してください：\n\n{text}")
                }
            }])
        }),
    );
}

fn parse_report_args(args: &Value, now: DateTime<Local>) -> Result<ReportRequest, WorkflowError> {
    let text = match args.get("text") {
        None | Some(Value::Null) => return Err(WorkflowError::InvalidArgument("text is required".to_string())),
        Some(Value::String(text)) => text.clone(),
        Some(_) => return Err(WorkflowError::InvalidArgument("text must be a string".to_string())),
    };
    let confirmed_by_user = match args.get("confirmed_by_user") {
        None | Some(Value::Null) => None,
        Some(Value::Bool(flag)) => Some(*flag),
        Some(_) => {
            return Err(WorkflowError::InvalidArgument(
                "confirmed_by_user must be a boolean".to_string(),
            ))
        }
    };
    Ok(ReportRequest {
        text,
        confirmed_by_user,
        tags: normalize_tags(args.get("tags")),
        now,
    })
}

fn structured_response(payload: Value) -> Value {
    json!({
        "content": [
            { "type": "text", "text": payload.to_string() }
        ],
        "structuredContent": payload
    })
}
