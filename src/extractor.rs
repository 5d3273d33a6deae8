//! 结构化结果提取
//!
//! 模型输出的 JSON 经常夹带 markdown 代码块、前后说明文字，或者被截断。
//! [`extract`] 是纯函数：剥掉一层代码块标记，按最先出现的 `{` 或 `[` 确定形状，
//! 截取到同类最后一个闭合括号，再交给 `serde_json` 解析。失败时返回具体原因，
//! 从不回退成默认值。

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// 错误片段最大字符数
pub const SNIPPET_MAX_CHARS: usize = 200;

const FENCE: &str = "```";

/// JSON 形状
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JsonShape {
    Object,
    Array,
}

impl JsonShape {
    fn brackets(&self) -> (char, char) {
        match self {
            JsonShape::Object => ('{', '}'),
            JsonShape::Array => ('[', ']'),
        }
    }
}

impl fmt::Display for JsonShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JsonShape::Object => f.write_str("object"),
            JsonShape::Array => f.write_str("array"),
        }
    }
}

/// 提取失败
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractionError {
    /// 文本中没有 `{` 或 `[`
    #[error("模型输出中未找到 JSON")]
    NoJsonFound,

    /// 找到起始括号但没有对应的闭合括号（通常是输出被截断）
    #[error("JSON {shape} 缺少闭合括号: {snippet}")]
    UnbalancedBrackets { shape: JsonShape, snippet: String },

    /// 截取的片段不是合法 JSON
    #[error("JSON 语法错误: {message}, 片段: {snippet}")]
    SyntaxError { message: String, snippet: String },

    /// JSON 合法但与目标结构不符
    #[error("JSON 结构不符合预期: {message}")]
    SchemaMismatch { message: String },
}

/// 提取成功的 JSON
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractedJson {
    pub shape: JsonShape,
    pub value: Value,
}

impl ExtractedJson {
    /// 反序列化为具体类型
    pub fn into_typed<T: DeserializeOwned>(self) -> Result<T, ExtractionError> {
        serde_json::from_value(self.value).map_err(|e| ExtractionError::SchemaMismatch {
            message: e.to_string(),
        })
    }
}

pub type ExtractionResult = Result<ExtractedJson, ExtractionError>;

/// 从模型输出中提取 JSON
pub fn extract(text: &str) -> ExtractionResult {
    let fenced = strip_fence(text);
    let region = if find_open(fenced).is_some() {
        fenced
    } else {
        text
    };

    let (shape, start) = find_open(region).ok_or(ExtractionError::NoJsonFound)?;
    let (_, close) = shape.brackets();

    let end = match region[start..].rfind(close) {
        Some(offset) => start + offset,
        None => {
            return Err(ExtractionError::UnbalancedBrackets {
                shape,
                snippet: snippet(&region[start..]),
            })
        }
    };

    // 开闭括号都是 ASCII，end + 1 一定落在字符边界上
    let candidate = &region[start..=end];
    match serde_json::from_str::<Value>(candidate) {
        Ok(value) => Ok(ExtractedJson { shape, value }),
        Err(e) => Err(ExtractionError::SyntaxError {
            message: e.to_string(),
            snippet: snippet(candidate),
        }),
    }
}

/// 提取并反序列化为具体类型
pub fn extract_typed<T: DeserializeOwned>(text: &str) -> Result<T, ExtractionError> {
    extract(text)?.into_typed()
}

/// 剥掉一层 markdown 代码块
///
/// 取第一个 ``` 之后（跳过语言标记）到最后一个 ``` 之前的内容；
/// 只有开头标记时（输出被截断）取其后全部内容。
fn strip_fence(text: &str) -> &str {
    let Some(open) = text.find(FENCE) else {
        return text;
    };

    let after = &text[open + FENCE.len()..];
    let body_start = after
        .find(|c: char| !c.is_ascii_alphanumeric())
        .unwrap_or(after.len());
    let body = &after[body_start..];

    match body.rfind(FENCE) {
        Some(close) => &body[..close],
        None => body,
    }
}

/// 最先出现的起始括号
fn find_open(text: &str) -> Option<(JsonShape, usize)> {
    match (text.find('{'), text.find('[')) {
        (Some(o), Some(a)) if a < o => Some((JsonShape::Array, a)),
        (Some(o), _) => Some((JsonShape::Object, o)),
        (None, Some(a)) => Some((JsonShape::Array, a)),
        (None, None) => None,
    }
}

/// 截取前 200 个字符
fn snippet(text: &str) -> String {
    text.chars().take(SNIPPET_MAX_CHARS).collect()
}
