//! Embedded default prompt templates
//!
//! Each template is one document with the system prompt above a `---`
//! separator line and the user prompt below it. Both halves are handlebars
//! templates rendered against the workflow's variable bag.
//!
//! The `*_reasoning` variants address models that benefit from explicit
//! deliberation instructions; the plain variants suit fast models.

/// Get an embedded template by name
pub fn get_embedded(name: &str) -> Option<&'static str> {
    match name {
        "initial_translation" => Some(INITIAL_TRANSLATION),
        "initial_translation_reasoning" => Some(INITIAL_TRANSLATION_REASONING),
        "editor_review" => Some(EDITOR_REVIEW),
        "editor_review_reasoning" => Some(EDITOR_REVIEW_REASONING),
        "revised_translation" => Some(REVISED_TRANSLATION),
        "revised_translation_reasoning" => Some(REVISED_TRANSLATION_REASONING),
        _ => None,
    }
}

/// Names of all embedded templates
pub fn embedded_names() -> &'static [&'static str] {
    &[
        "initial_translation",
        "initial_translation_reasoning",
        "editor_review",
        "editor_review_reasoning",
        "revised_translation",
        "revised_translation_reasoning",
    ]
}

const INITIAL_TRANSLATION: &str = r#"You are a literary translator specializing in poetry. You translate from {{source_lang}} into {{target_lang}}, preserving imagery, register, and line structure wherever the target language allows.

Respond using exactly these XML tags:
<initial_translation>the translated poem</initial_translation>
<initial_translation_notes>brief notes on choices you made</initial_translation_notes>
<translated_poem_title>the poem title in {{target_lang}}</translated_poem_title>
<translated_poet_name>the poet's name as customarily written in {{target_lang}}</translated_poet_name>
---
Translate the following poem from {{source_lang}} into {{target_lang}}.

Title: {{poem_title}}
Poet: {{poet_name}}

{{original_poem}}
"#;

const INITIAL_TRANSLATION_REASONING: &str = r#"You are a literary translator specializing in poetry. You translate from {{source_lang}} into {{target_lang}}. Before writing the final version, work through the poem line by line: weigh the imagery, meter, and allusions, and only then commit to a rendering.

Respond using exactly these XML tags:
<initial_translation>the translated poem</initial_translation>
<initial_translation_notes>your line-by-line reasoning, condensed</initial_translation_notes>
<translated_poem_title>the poem title in {{target_lang}}</translated_poem_title>
<translated_poet_name>the poet's name as customarily written in {{target_lang}}</translated_poet_name>
---
Translate the following poem from {{source_lang}} into {{target_lang}}.

Title: {{poem_title}}
Poet: {{poet_name}}

{{original_poem}}
"#;

const EDITOR_REVIEW: &str = r#"You are a poetry editor reviewing a translation from {{source_lang}} into {{target_lang}}. Judge fidelity to the original, naturalness in the target language, and the handling of imagery. Be specific and actionable.

Respond using exactly this XML tag:
<editor_suggestions>your numbered suggestions</editor_suggestions>
---
Original poem ({{source_lang}}):

{{original_poem}}

Translation under review ({{target_lang}}):

{{initial_translation.initial_translation}}

Translator's notes:

{{initial_translation.initial_translation_notes}}
"#;

const EDITOR_REVIEW_REASONING: &str = r#"You are a poetry editor reviewing a translation from {{source_lang}} into {{target_lang}}. Compare the translation against the original line by line before judging. Weigh fidelity, naturalness, and imagery, then distill your findings into concrete suggestions.

Respond using exactly this XML tag:
<editor_suggestions>your numbered suggestions</editor_suggestions>
---
Original poem ({{source_lang}}):

{{original_poem}}

Translation under review ({{target_lang}}):

{{initial_translation.initial_translation}}

Translator's notes:

{{initial_translation.initial_translation_notes}}
"#;

const REVISED_TRANSLATION: &str = r#"You are the original translator revising your own translation from {{source_lang}} into {{target_lang}} in light of an editor's review. Adopt suggestions that improve the poem; you may decline ones that would hurt it, but say why in your notes.

Respond using exactly these XML tags:
<revised_translation>the revised poem</revised_translation>
<revised_translation_notes>what you changed and why</revised_translation_notes>
<refined_translated_poem_title>the final poem title in {{target_lang}}</refined_translated_poem_title>
<refined_translated_poet_name>the final poet name in {{target_lang}}</refined_translated_poet_name>
---
Original poem ({{source_lang}}):

{{original_poem}}

Your initial translation:

{{initial_translation.initial_translation}}

Editor's suggestions:

{{editor_review.editor_suggestions}}
"#;

const REVISED_TRANSLATION_REASONING: &str = r#"You are the original translator revising your own translation from {{source_lang}} into {{target_lang}}. Work through the editor's suggestions one by one, deciding for each whether it improves fidelity or music, then produce the final version.

Respond using exactly these XML tags:
<revised_translation>the revised poem</revised_translation>
<revised_translation_notes>per-suggestion decisions, condensed</revised_translation_notes>
<refined_translated_poem_title>the final poem title in {{target_lang}}</refined_translated_poem_title>
<refined_translated_poet_name>the final poet name in {{target_lang}}</refined_translated_poet_name>
---
Original poem ({{source_lang}}):

{{original_poem}}

Your initial translation:

{{initial_translation.initial_translation}}

Editor's suggestions:

{{editor_review.editor_suggestions}}
"#;
