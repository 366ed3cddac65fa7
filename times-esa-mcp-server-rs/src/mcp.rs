use serde_json::{json, Value};
use std::collections::HashMap;
use std::io::{self, BufRead, Write};
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

const DEFAULT_PROTOCOL_VERSION: &str = "2024-11-05";

pub type ToolHandler = Box<dyn Fn(Value) -> Result<Value, String> + Send + Sync>;
pub type PromptHandler = Box<dyn Fn(&Value) -> Value + Send + Sync>;

pub struct Tool {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
    pub handler: ToolHandler,
}

pub struct Prompt {
    pub name: String,
    pub description: String,
    pub arguments: Value,
    pub handler: PromptHandler,
}

pub struct McpServer {
    name: String,
    version: String,
    tools: HashMap<String, Tool>,
    prompts: HashMap<String, Prompt>,
}

impl McpServer {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            tools: HashMap::new(),
            prompts: HashMap::new(),
        }
    }

    pub fn register_tool(
        &mut self,
        name: &str,
        description: &str,
        input_schema: Value,
        handler: ToolHandler,
    ) {
        self.tools.insert(
            name.to_string(),
            Tool {
                name: name.to_string(),
                description: description.to_string(),
                input_schema,
                handler,
            },
        );
    }

    pub fn register_prompt(
        &mut self,
        name: &str,
        description: &str,
        arguments: Value,
        handler: PromptHandler,
    ) {
        self.prompts.insert(
            name.to_string(),
            Prompt {
                name: name.to_string(),
                description: description.to_string(),
                arguments,
                handler,
            },
        );
    }

    pub fn run_stdio(self) -> io::Result<()> {
        let stdin = io::stdin();
        self.serve(stdin.lock(), io::stdout())
    }

    pub fn serve<R, W>(self, input: R, output: W) -> io::Result<()>
    where
        R: BufRead,
        W: Write + Send + 'static,
    {
        let server = Arc::new(self);
        let output = Arc::new(Mutex::new(output));
        let mut workers: Vec<JoinHandle<()>> = Vec::new();

        let result = read_requests(&server, input, &output, &mut workers);
        for worker in workers {
            if worker.join().is_err() {
                tracing::error!("[mcp] tool worker panicked");
            }
        }
        result
    }

    fn handle_request(&self, request: Value) -> Option<Value> {
        let id_val = request.get("id").cloned()?;
        let method = request
            .get("method")
            .and_then(|v| v.as_str())
            .unwrap_or("");
        let params = request.get("params").cloned().unwrap_or_else(|| json!({}));
        match method {
            "initialize" => {
                let protocol_version = params
                    .get("protocolVersion")
                    .and_then(|v| v.as_str())
                    .unwrap_or(DEFAULT_PROTOCOL_VERSION);
                let result = json!({
                    "protocolVersion": protocol_version,
                    "serverInfo": {
                        "name": self.name,
                        "version": self.version,
                    },
                    "capabilities": {
                        "tools": { "listChanged": false },
                        "prompts": { "listChanged": false }
                    }
                });
                Some(ok(id_val, result))
            }
            "tools/list" => {
                let tools: Vec<Value> = self
                    .tools
                    .values()
                    .map(|tool| {
                        json!({
                            "name": tool.name,
                            "description": tool.description,
                            "inputSchema": tool.input_schema,
                        })
                    })
                    .collect();
                Some(ok(id_val, json!({ "tools": tools })))
            }
            "tools/call" => {
                let name = params
                    .get("name")
                    .and_then(|v| v.as_str())
                    .unwrap_or("");
                let args = params
                    .get("arguments")
                    .cloned()
                    .unwrap_or_else(|| json!({}));
                let tool = match self.tools.get(name) {
                    Some(tool) => tool,
                    None => {
                        return Some(err(
                            id_val,
                            -32601,
                            format!("Tool not found: {name}"),
                        ));
                    }
                };
                match (tool.handler)(args) {
                    Ok(result) => Some(ok(id_val, result)),
                    Err(message) => Some(err(id_val, -32603, message)),
                }
            }
            "prompts/list" => {
                let prompts: Vec<Value> = self
                    .prompts
                    .values()
                    .map(|prompt| {
                        json!({
                            "name": prompt.name,
                            "description": prompt.description,
                            "arguments": prompt.arguments,
                        })
                    })
                    .collect();
                Some(ok(id_val, json!({ "prompts": prompts })))
            }
            "prompts/get" => {
                let name = params
                    .get("name")
                    .and_then(|v| v.as_str())
                    .unwrap_or("");
                let args = params
                    .get("arguments")
                    .cloned()
                    .unwrap_or_else(|| json!({}));
                match self.prompts.get(name) {
                    Some(prompt) => Some(ok(
                        id_val,
                        json!({
                            "description": prompt.description,
                            "messages": (prompt.handler)(&args),
                        }),
                    )),
                    None => Some(err(
                        id_val,
                        -32601,
                        format!("Prompt not found: {name}"),
                    )),
                }
            }
            "ping" => Some(ok(id_val, json!({}))),
            _ => Some(err(
                id_val,
                -32601,
                format!("Method not found: {method}"),
            )),
        }
    }
}

fn read_requests<R, W>(
    server: &Arc<McpServer>,
    input: R,
    output: &Arc<Mutex<W>>,
    workers: &mut Vec<JoinHandle<()>>,
) -> io::Result<()>
where
    R: BufRead,
    W: Write + Send + 'static,
{
    for line in input.lines() {
        let line = match line {
            Ok(line) => line,
            Err(err) if err.kind() == io::ErrorKind::InvalidData => {
                tracing::warn!("[mcp] unreadable line: {err}");
                continue;
            }
            Err(err) => return Err(err),
        };
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let request: Value = match serde_json::from_str(trimmed) {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!("[mcp] invalid json: {err}");
                continue;
            }
        };

        let is_call = request.get("method").and_then(|v| v.as_str()) == Some("tools/call");
        if is_call && request.get("id").is_some() {
            workers.retain(|worker| !worker.is_finished());
            let server = server.clone();
            let output = output.clone();
            workers.push(std::thread::spawn(move || {
                let id = request.get("id").cloned().unwrap_or(Value::Null);
                let response = match panic::catch_unwind(AssertUnwindSafe(|| server.handle_request(request))) {
                    Ok(response) => response,
                    Err(_) => {
                        tracing::error!("[mcp] tool handler panicked");
                        Some(err(id, -32603, "tool handler panicked".to_string()))
                    }
                };
                if let Some(response) = response {
                    if let Err(err) = write_message(&output, &response) {
                        tracing::error!("[mcp] failed to write response: {err}");
                    }
                }
            }));
            continue;
        }

        if let Some(response) = server.handle_request(request) {
            write_message(output, &response)?;
        }
    }
    Ok(())
}

fn write_message<W: Write>(output: &Mutex<W>, message: &Value) -> io::Result<()> {
    let serialized = serde_json::to_string(message)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    let mut out = output.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    out.write_all(serialized.as_bytes())?;
    out.write_all(b"\n")?;
    out.flush()
}

fn ok(id: Value, result: Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "result": result,
    })
}

fn err(id: Value, code: i64, message: String) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "error": {
            "code": code,
            "message": message,
        }
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::Cursor;

    #[derive(Clone, Default)]
    pub(crate) struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    pub(crate) fn exchange(server: McpServer, lines: &[Value]) -> HashMap<String, Value> {
        let input: String = lines.iter().map(|l| format!("{l}\n")).collect();
        exchange_bytes(server, input.into_bytes())
    }

    fn exchange_bytes(server: McpServer, input: Vec<u8>) -> HashMap<String, Value> {
        let buffer = SharedBuffer::default();
        server.serve(Cursor::new(input), buffer.clone()).unwrap();
        let raw = buffer.0.lock().unwrap().clone();
        String::from_utf8(raw)
            .unwrap()
            .lines()
            .map(|line| {
                let value: Value = serde_json::from_str(line).unwrap();
                (value["id"].to_string(), value)
            })
            .collect()
    }

    fn echo_server() -> McpServer {
        let mut server = McpServer::new("test", "0.0.1");
        server.register_tool(
            "echo",
            "Echo arguments back.",
            json!({ "type": "object" }),
            Box::new(|args: Value| {
                if args.get("fail").is_some() {
                    return Err("boom".to_string());
                }
                Ok(args)
            }),
        );
        server.register_prompt(
            "hello",
            "Say hello.",
            json!([{ "name": "who", "required": false }]),
            Box::new(|args: &Value| json!([{ "role": "user", "content": { "type": "text", "text": args["who"] } }])),
        );
        server
    }

    #[test]
    fn answers_lifecycle_and_listing_requests() {
        let responses = exchange(
            echo_server(),
            &[
                json!({ "jsonrpc": "2.0", "id": 1, "method": "initialize", "params": { "protocolVersion": "2025-03-26" } }),
                json!({ "jsonrpc": "2.0", "method": "notifications/initialized" }),
                json!({ "jsonrpc": "2.0", "id": 2, "method": "tools/list" }),
                json!({ "jsonrpc": "2.0", "id": 3, "method": "prompts/list" }),
                json!({ "jsonrpc": "2.0", "id": 4, "method": "ping" }),
                json!({ "jsonrpc": "2.0", "id": 5, "method": "resources/list" }),
            ],
        );
        assert_eq!(responses.len(), 5);
        assert_eq!(responses["1"]["result"]["protocolVersion"], "2025-03-26");
        assert_eq!(responses["1"]["result"]["serverInfo"]["name"], "test");
        assert_eq!(responses["2"]["result"]["tools"][0]["name"], "echo");
        assert_eq!(responses["3"]["result"]["prompts"][0]["name"], "hello");
        assert_eq!(responses["4"]["result"], json!({}));
        assert_eq!(responses["5"]["error"]["code"], -32601);
    }

    #[test]
    fn dispatches_tool_calls_and_prompts() {
        let responses = exchange(
            echo_server(),
            &[
                json!({ "jsonrpc": "2.0", "id": "a", "method": "tools/call", "params": { "name": "echo", "arguments": { "x": 1 } } }),
                json!({ "jsonrpc": "2.0", "id": "b", "method": "tools/call", "params": { "name": "echo", "arguments": { "fail": true } } }),
                json!({ "jsonrpc": "2.0", "id": "c", "method": "tools/call", "params": { "name": "missing" } }),
                json!({ "jsonrpc": "2.0", "id": "d", "method": "prompts/get", "params": { "name": "hello", "arguments": { "who": "esa" } } }),
                json!({ "jsonrpc": "2.0", "id": "e", "method": "prompts/get", "params": { "name": "nope" } }),
            ],
        );
        assert_eq!(responses["\"a\""]["result"], json!({ "x": 1 }));
        assert_eq!(responses["\"b\""]["error"]["code"], -32603);
        assert_eq!(responses["\"b\""]["error"]["message"], "boom");
        assert_eq!(responses["\"c\""]["error"]["message"], "Tool not found: missing");
        assert_eq!(responses["\"d\""]["result"]["messages"][0]["content"]["text"], "esa");
        assert_eq!(responses["\"d\""]["result"]["description"], "Say hello.");
        assert_eq!(responses["\"e\""]["error"]["message"], "Prompt not found: nope");
    }

    #[test]
    fn skips_blank_and_malformed_lines() {
        let buffer = SharedBuffer::default();
        let input = "\n{not json}\n{\"jsonrpc\":\"2.0\",\"id\":9,\"method\":\"ping\"}\n";
        echo_server()
            .serve(Cursor::new(input.as_bytes().to_vec()), buffer.clone())
            .unwrap();
        let raw = String::from_utf8(buffer.0.lock().unwrap().clone()).unwrap();
        assert_eq!(raw.lines().count(), 1);
        assert!(raw.contains("\"id\":9"));
    }

    #[test]
    fn unreadable_line_is_skipped_and_in_flight_calls_finish() {
        let mut server = echo_server();
        server.register_tool(
            "slow",
            "Answer after a pause.",
            json!({ "type": "object" }),
            Box::new(|_args: Value| -> Result<Value, String> {
                std::thread::sleep(std::time::Duration::from_millis(300));
                Ok(json!({ "done": true }))
            }),
        );
        let mut input = b"{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"tools/call\",\"params\":{\"name\":\"slow\"}}\n".to_vec();
        input.extend_from_slice(b"\xff\xfe bad bytes\n");
        input.extend_from_slice(b"{\"jsonrpc\":\"2.0\",\"id\":2,\"method\":\"ping\"}\n");

        let responses = exchange_bytes(server, input);
        assert_eq!(responses.len(), 2);
        assert_eq!(responses["1"]["result"]["done"], true);
        assert_eq!(responses["2"]["result"], json!({}));
    }

    #[test]
    fn panicking_tool_still_gets_an_answer() {
        let mut server = echo_server();
        server.register_tool(
            "explode",
            "Always panics.",
            json!({ "type": "object" }),
            Box::new(|_args: Value| -> Result<Value, String> { panic!("handler bug") }),
        );
        let responses = exchange(
            server,
            &[
                json!({ "jsonrpc": "2.0", "id": 7, "method": "tools/call", "params": { "name": "explode" } }),
                json!({ "jsonrpc": "2.0", "id": 8, "method": "tools/call", "params": { "name": "echo", "arguments": { "ok": 1 } } }),
            ],
        );
        assert_eq!(responses["7"]["error"]["code"], -32603);
        assert_eq!(responses["7"]["error"]["message"], "tool handler panicked");
        assert_eq!(responses["8"]["result"], json!({ "ok": 1 }));
    }
}
