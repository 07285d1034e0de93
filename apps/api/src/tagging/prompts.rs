//! System prompt construction for label extraction.
//!
//! The default template embeds the three vocabularies through placeholders.
//! User-supplied templates may use the same placeholders, or none at all, in
//! which case they are sent verbatim.

use crate::taxonomy::{MajorVocabulary, Taxonomy, Vocabulary};

pub const COUNTRY_PLACEHOLDER: &str = "{country_list}";
pub const DEGREE_PLACEHOLDER: &str = "{degree_list}";
pub const MAJOR_PLACEHOLDER: &str = "{major_list}";

/// Separator between flat vocabulary entries.
const LIST_SEPARATOR: &str = "、";

/// Default extraction prompt. Replace `{country_list}`, `{degree_list}` and
/// `{major_list}` before sending.
pub const DEFAULT_PROMPT_TEMPLATE: &str = r#"你是一名留学意向标签识别助手。请从用户的自然语言描述中提取三个标签：国家、学历、专业。

## 标签池（只能从下列标签中选择）

### 国家：
{country_list}

### 学历：
{degree_list}

### 专业（一级专业下缩进列出其二级专业）：
{major_list}

## 规则

1. 国家、学历、专业只能使用标签池中出现的原文，不得自创标签，也不得改写、缩写或翻译标签文字。
2. 专业必须以"一级专业 + 二级专业"的组合给出，且二级专业必须属于所选一级专业。
   如果用户只提到二级专业，请找出它所属的一级专业，例如：理工科 → 计算机，商科 → 金融学。
3. 如果某个标签无法确定，也必须从标签池中选择最接近的选项，不要返回 null。

## 输出格式

只输出一个 JSON 对象，恰好包含以下四个键，每个值为标签池中的字符串或 null：

{
  "country": "国家名称或null",
  "degree": "学历名称或null",
  "major": "一级专业名称或null",
  "sub_major": "二级专业名称或null"
}

JSON 对象之外不得输出任何文字、解释或注释。

请分析以下用户输入并提取标签："#;

/// Where the final system prompt text came from. Reported in logs only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptSource {
    Default,
    CustomTemplate,
    CustomVerbatim,
}

pub fn render_countries(countries: &Vocabulary) -> String {
    render_flat(countries)
}

pub fn render_degrees(degrees: &Vocabulary) -> String {
    render_flat(degrees)
}

fn render_flat(vocabulary: &Vocabulary) -> String {
    vocabulary.names().collect::<Vec<_>>().join(LIST_SEPARATOR)
}

/// Renders each top-level major on its own line with its children indented beneath it.
pub fn render_majors(majors: &MajorVocabulary) -> String {
    let mut lines = Vec::new();
    for (major, entry) in majors.iter() {
        lines.push(major.to_string());
        for sub_major in entry.children.names() {
            lines.push(format!("  - {sub_major}"));
        }
    }
    lines.join("\n")
}

/// True if `template` carries at least one vocabulary placeholder.
pub fn has_placeholders(template: &str) -> bool {
    [COUNTRY_PLACEHOLDER, DEGREE_PLACEHOLDER, MAJOR_PLACEHOLDER]
        .iter()
        .any(|placeholder| template.contains(placeholder))
}

/// Substitutes whichever vocabulary placeholders appear in `template`.
pub fn fill_template(template: &str, taxonomy: &Taxonomy) -> String {
    template
        .replace(COUNTRY_PLACEHOLDER, &render_countries(taxonomy.countries()))
        .replace(DEGREE_PLACEHOLDER, &render_degrees(taxonomy.degrees()))
        .replace(MAJOR_PLACEHOLDER, &render_majors(taxonomy.majors()))
}

pub fn default_prompt(taxonomy: &Taxonomy) -> String {
    fill_template(DEFAULT_PROMPT_TEMPLATE, taxonomy)
}

/// Builds the system prompt. A blank or absent `custom` falls back to the default.
pub fn build_system_prompt(taxonomy: &Taxonomy, custom: Option<&str>) -> (String, PromptSource) {
    match custom.filter(|c| !c.trim().is_empty()) {
        None => (default_prompt(taxonomy), PromptSource::Default),
        Some(template) if has_placeholders(template) => {
            (fill_template(template, taxonomy), PromptSource::CustomTemplate)
        }
        Some(template) => (template.to_string(), PromptSource::CustomVerbatim),
    }
}
