use super::language::language_name;
use super::payload::PayloadShape;

const COMMON_RULES: &str = "\
- Preserve placeholders exactly as written, e.g. {{name}}, {count}, %s, :param.
- Preserve HTML tags, attributes, markdown and line breaks.
- Do not translate URLs, email addresses or product names.
- Return only JSON, with no explanations and no code fences.";

/// System instruction for one batch.
pub fn system_prompt(shape: &PayloadShape, source: &str, target: &str) -> String {
    let source = language_name(source);
    let target = language_name(target);

    let shape_rules = match shape {
        PayloadShape::Flat { .. } => "\
You receive a JSON object mapping keys to texts.
Translate every value. Keep every key unchanged.
Respond with a JSON object with exactly the same keys."
            .to_string(),
        PayloadShape::Structured { fields, cells } => {
            let mut rules = format!(
                "You receive a JSON array of records, each with an \"index\".\n\
                 Translate only these fields: {}.",
                fields.join(", ")
            );
            if let Some(cells) = cells {
                rules.push_str(&format!(
                    "\nEach record may have a \"cells\" array; inside it translate only: {}. \
                     Keep each cell's \"index\".",
                    cells.text_fields.join(", ")
                ));
            }
            rules.push_str(
                "\nRespond with a JSON array of the same length, in the same order, \
                 keeping every \"index\" unchanged.",
            );
            rules
        }
    };

    format!(
        "You are a professional translator. Translate from {} to {}.\n{}\n{}",
        source, target, shape_rules, COMMON_RULES
    )
}
