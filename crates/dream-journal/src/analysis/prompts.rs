//! Prompt construction for dream, theme and global analyses.
use crate::analysis::types::Language;
use crate::journal_db::schema::Dream;

/// Most recent dreams considered by a global analysis.
pub const GLOBAL_ANALYSIS_WINDOW: usize = 10;

const DREAM_SHAPE_FR: &str = r#"{
  "title": "string (un titre court et évocateur pour ce rêve)",
  "imagePrompt": "string (prompt en anglais pour DALL-E, détaillé et artistique)",
  "interpretations": [
    {
      "aspect": "string (l'aspect du rêve analysé)",
      "explanations": [
        { "explanation": "string (explication détaillée)", "confidence": "number (0-100)" }
      ]
    }
  ],
  "overallMood": "string (l'ambiance/ton général du rêve)",
  "keywords": ["tableau des thèmes/symboles clés"]
}"#;

const DREAM_SHAPE_EN: &str = r#"{
  "title": "string (a short and evocative title for this dream)",
  "imagePrompt": "string (detailed and artistic English prompt for DALL-E)",
  "interpretations": [
    {
      "aspect": "string (the aspect of the dream being analyzed)",
      "explanations": [
        { "explanation": "string (detailed explanation)", "confidence": "number (0-100)" }
      ]
    }
  ],
  "overallMood": "string (general mood/tone of the dream)",
  "keywords": ["array of key themes/symbols"]
}"#;

const THEME_SHAPE_FR: &str = r#"{
  "theme": "string (le thème analysé)",
  "explanation": "string (explication détaillée de la signification)",
  "examples": ["tableau d'exemples de rêves contenant ce thème"],
  "relatedThemes": ["tableau de thèmes connexes"]
}"#;

const THEME_SHAPE_EN: &str = r#"{
  "theme": "string (the analyzed theme)",
  "explanation": "string (detailed explanation of the meaning)",
  "examples": ["array of example dreams containing this theme"],
  "relatedThemes": ["array of related themes"]
}"#;

const GLOBAL_SHAPE_FR: &str = r#"{
  "patterns": [
    {
      "title": "string (titre du motif identifié)",
      "description": "string (description détaillée basée sur les interprétations validées)",
      "frequency": "number (pourcentage d'occurrence)",
      "relatedDreams": [number] (indices des rêves concernés, 1-based)
    }
  ],
  "psychologicalInsights": "string (insights psychologiques globaux, en tenant compte des validations)",
  "recommendations": ["string (recommandations ou suggestions personnalisées)"],
  "emotionalThemes": {
    "dominant": "string (émotion dominante)",
    "secondary": ["string (émotions secondaires)"],
    "evolution": "string (évolution émotionnelle observée)"
  }
}"#;

const GLOBAL_SHAPE_EN: &str = r#"{
  "patterns": [
    {
      "title": "string (identified pattern title)",
      "description": "string (detailed description based on validated interpretations)",
      "frequency": "number (occurrence percentage)",
      "relatedDreams": [number] (indices of related dreams, 1-based)
    }
  ],
  "psychologicalInsights": "string (global psychological insights, taking validations into account)",
  "recommendations": ["string (personalized recommendations or suggestions)"],
  "emotionalThemes": {
    "dominant": "string (dominant emotion)",
    "secondary": ["string (secondary emotions)"],
    "evolution": "string (observed emotional evolution)"
  }
}"#;

pub fn dream_prompt(language: Language, dream: &str) -> String {
    match language {
        Language::Fr => format!(
            "Analysez ce rêve et fournissez une interprétation structurée en français. \
             Le titre doit être court et évocateur.\n\
             Pour chaque aspect du rêve, fournissez 2 à 3 explications différentes et \
             complémentaires, classées par niveau de confiance.\n\
             Créez aussi un prompt en anglais pour DALL-E qui générera une image artistique \
             représentant ce rêve. Le prompt pour l'image doit être évocateur, poétique et \
             détaillé, en mettant l'accent sur l'ambiance et les éléments visuels clés.\n\
             Formatez la réponse comme un objet JSON avec la structure suivante:\n{}\n\n\
             IMPORTANT: Pour chaque aspect du rêve, fournissez au moins 2 explications \
             différentes pour offrir des perspectives variées.\n\n\
             Rêve: {}",
            DREAM_SHAPE_FR, dream
        ),
        Language::En => format!(
            "Analyze this dream and provide a structured interpretation. \
             The title should be short and evocative.\n\
             For each aspect of the dream, provide 2 to 3 different and complementary \
             explanations, ranked by confidence level.\n\
             Also create an English prompt for DALL-E to generate an artistic image \
             representing this dream. The image prompt should be evocative, poetic, and \
             detailed, emphasizing the mood and key visual elements.\n\
             Format the response as a JSON object with the following structure:\n{}\n\n\
             IMPORTANT: For each aspect of the dream, provide at least 2 different \
             explanations to offer varied perspectives.\n\n\
             Dream: {}",
            DREAM_SHAPE_EN, dream
        ),
    }
}

pub fn theme_prompt(language: Language, theme: &str) -> String {
    match language {
        Language::Fr => format!(
            "Analysez la signification du thème \"{}\" dans les rêves. Fournissez une \
             explication détaillée et structurée en français.\n\
             Formatez la réponse comme un objet JSON avec la structure suivante:\n{}",
            theme, THEME_SHAPE_FR
        ),
        Language::En => format!(
            "Analyze the meaning of the theme \"{}\" in dreams. Provide a detailed and \
             structured explanation.\n\
             Format the response as a JSON object with the following structure:\n{}",
            theme, THEME_SHAPE_EN
        ),
    }
}

/// Dreams with content, newest first, capped at [`GLOBAL_ANALYSIS_WINDOW`].
pub fn select_recent_dreams(dreams: &[Dream]) -> Vec<&Dream> {
    let mut recent: Vec<&Dream> = dreams
        .iter()
        .filter(|dream| !dream.content.trim().is_empty())
        .collect();
    recent.sort_by(|a, b| b.date.cmp(&a.date));
    recent.truncate(GLOBAL_ANALYSIS_WINDOW);
    recent
}

/// Prompt over already-selected dreams; numbering is 1-based to match `relatedDreams`.
pub fn global_prompt(language: Language, recent: &[&Dream]) -> String {
    let (dream_label, validated_label, none_label) = match language {
        Language::Fr => ("Rêve", "Interprétations validées", "Aucune interprétation validée"),
        Language::En => ("Dream", "Validated interpretations", "No validated interpretations"),
    };

    let listing = recent
        .iter()
        .enumerate()
        .map(|(i, dream)| {
            let validated: Vec<String> = dream
                .analysis
                .iter()
                .flat_map(|analysis| analysis.interpretations.iter())
                .flat_map(|interpretation| {
                    interpretation
                        .explanations
                        .iter()
                        .filter(|e| e.is_validated)
                        .map(move |e| format!("   - {}: {}", interpretation.aspect, e.explanation))
                })
                .collect();

            let hints = if validated.is_empty() {
                format!("   {}", none_label)
            } else {
                format!("   {}:\n{}", validated_label, validated.join("\n"))
            };
            format!("{}. {}: {}\n{}", i + 1, dream_label, dream.content, hints)
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    match language {
        Language::Fr => format!(
            "Analysez ces {} rêves récents et trouvez des liens, motifs ou thèmes récurrents.\n\
             Pour chaque rêve, je vous fournis également les interprétations que l'utilisateur \
             a validées comme pertinentes.\n\
             Utilisez ces validations pour affiner votre analyse et la personnaliser.\n\n\
             Rêves à analyser:\n{}\n\n\
             Formatez la réponse comme un objet JSON avec la structure suivante:\n{}",
            recent.len(),
            listing,
            GLOBAL_SHAPE_FR
        ),
        Language::En => format!(
            "Analyze these {} recent dreams and find connections, patterns, or recurring themes.\n\
             For each dream, I'm also providing the interpretations that the user has validated \
             as relevant.\n\
             Use these validations to refine your analysis and personalize it.\n\n\
             Dreams to analyze:\n{}\n\n\
             Format the response as a JSON object with the following structure:\n{}",
            recent.len(),
            listing,
            GLOBAL_SHAPE_EN
        ),
    }
}
