// Prompt templates for the three model calls. Wording is part of the
// contract with the model; change it deliberately.

use crate::models::Source;

pub fn build_graph_prompt(document_text: &str) -> String {
    format!(
        r#"Analyze this document text and extract key concepts to create a mind map structure.

Document content:
{document_text}

Return a JSON object with this exact structure:
{{
  "nodes": [
    {{
      "id": "1",
      "type": "default",
      "position": {{ "x": 0, "y": 0 }},
      "data": {{ "label": "Main Topic" }}
    }}
  ],
  "edges": [
    {{
      "id": "e1-2",
      "source": "1",
      "target": "2",
      "type": "smoothstep"
    }}
  ]
}}

Guidelines:
1. Create a central node for the main topic
2. Create child nodes for major concepts (positioned around the center)
3. Create connections showing relationships
4. Use clear, concise labels (2-5 words)
5. Position nodes in a radial layout around the center
6. Space nodes 200-300 pixels apart
7. Include 8-15 key concepts total

Return ONLY valid JSON, no other text."#
    )
}

/// Numbered title/snippet/url block, or nothing when there are no sources.
fn full_reference_block(sources: &[Source]) -> String {
    if sources.is_empty() {
        return String::new();
    }
    let mut block = String::from("\n\nReference information from reputable sources:\n");
    for (idx, source) in sources.iter().enumerate() {
        block.push_str(&format!(
            "\n{}. {}\n{}\nSource: {}\n",
            idx + 1,
            source.title,
            source.snippet,
            source.url
        ));
    }
    block
}

pub fn build_verification_prompt(statement: &str, sources: &[Source]) -> String {
    format!(
        r#"Verify the medical accuracy of this statement: "{statement}"{references}

Provide a JSON response with this structure:
{{
  "verified": true/false,
  "explanation": "brief explanation of accuracy",
  "confidence": "high/medium/low"
}}

Return ONLY valid JSON."#,
        references = full_reference_block(sources),
    )
}

pub fn build_regeneration_prompt(concept: &str, sources: &[Source]) -> String {
    format!(
        "Improve and correct this medical concept: \"{concept}\"{references}\n\n\
         Provide a corrected, accurate version of this concept in 2-5 words. \
         Return ONLY the improved text, nothing else.",
        references = full_reference_block(sources),
    )
}

/// Verification of a freshly regenerated label; snippets only.
pub fn build_reverification_prompt(statement: &str, sources: &[Source]) -> String {
    let mut references = String::new();
    if !sources.is_empty() {
        references.push_str("\n\nReference information:\n");
        for (idx, source) in sources.iter().enumerate() {
            references.push_str(&format!("\n{}. {}\n", idx + 1, source.snippet));
        }
    }
    format!(
        r#"Verify the medical accuracy of this statement: "{statement}"{references}

Provide a JSON response:
{{
  "verified": true/false,
  "explanation": "brief explanation",
  "confidence": "high/medium/low"
}}

Return ONLY valid JSON."#
    )
}
