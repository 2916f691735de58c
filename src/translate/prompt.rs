//! Prompt construction for the vocabulary-mixing provider call.
//! Pure functions: the instruction depends only on the level, the user payload
//! only on the texts.

use super::{Band, Level};

/// Words to replace, by band.
fn density_rule(band: Band) -> &'static str {
    match band {
        Band::Beginner => {
            "Replace only the most basic everyday words: common nouns and simple verbs. \
             Keep replacements sparse, at most one or two per short sentence."
        }
        Band::Intermediate => {
            "Replace common adjectives, phrasal verbs and everyday expressions, \
             in addition to basic nouns and verbs where natural."
        }
        Band::Advanced => {
            "Replace more specialised terms, academic vocabulary and idiomatic expressions. \
             Replacements may be denser and use less frequent words."
        }
    }
}

fn worked_example(band: Band) -> (&'static str, &'static str) {
    match band {
        Band::Beginner => (
            r#"["我喜欢读书", "今天天气真好"]"#,
            r#"["我喜欢读books", "今天weather真好"]"#,
        ),
        Band::Intermediate => (r#"["他经常熬夜工作"]"#, r#"["他经常stay up late工作"]"#),
        Band::Advanced => (
            r#"["这个观点很有洞察力"]"#,
            r#"["这个perspective很有insight"]"#,
        ),
    }
}

/// System instruction for a batch at `level`.
pub fn build_instruction(level: Level) -> String {
    let band = level.band();
    let (example_in, example_out) = worked_example(band);

    format!(
        "You are a bilingual reading assistant. The reader is learning English at CEFR level {level}. \
Replace some of the Chinese vocabulary in each text with suitable English words so the reader \
picks up new words while reading.\n\
\n\
Level rule ({level}): {density}\n\
\n\
Replacement principles:\n\
- Only replace words that are learnable one step above the reader's level.\n\
- Keep the original sentence structure, grammar, tone and colloquial style.\n\
- Never replace proper nouns, person names or brand names.\n\
- Never replace numbers, dates or units of measurement.\n\
- Never change UI elements, button captions or interface labels.\n\
- Leave interaction labels (for example \"赞同 117\", \"收藏\") and tag labels (for example \"关注\", \"热榜\") untouched.\n\
- Long passages get only 3-5 replacements; do not over-replace.\n\
\n\
Output format: the input is a JSON array of strings. Return a JSON array with exactly the same \
number of strings in exactly the same order, each string being the processed version of the \
input at the same position. Output only the JSON array, with no explanation and no code fence.\n\
\n\
Example (level {level}):\n\
Input: {example_in}\n\
Output: {example_out}",
        level = level,
        density = density_rule(band),
        example_in = example_in,
        example_out = example_out,
    )
}

/// User message: the texts as a JSON array, non-ASCII kept verbatim.
pub fn build_user_payload(texts: &[String]) -> String {
    // Serializing a slice of strings cannot fail.
    serde_json::to_string(texts).unwrap_or_else(|_| "[]".to_string())
}
