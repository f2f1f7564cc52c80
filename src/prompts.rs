//! Prompts for social-media caption generation.
//!
//! Every prompt lives here so the caption backend and the in-process client
//! send the same instructions, and so unit tests can inspect prompts without
//! calling a model.
//!
//! Callers can override the system prompt via
//! [`crate::config::CaptionConfig::system_prompt`]; the builders here are used
//! only when no override is provided.

use crate::config::CopywritingFramework;

/// One-sentence instruction describing how a framework structures the post.
pub fn framework_instruction(framework: CopywritingFramework) -> &'static str {
    match framework {
        CopywritingFramework::Aida => {
            "Structure the post using the AIDA (Attention, Interest, Desire, Action) framework."
        }
        CopywritingFramework::Pas => {
            "Structure the post using the PAS (Problem, Agitate, Solution) framework."
        }
        CopywritingFramework::Storytelling => {
            "Write the post by telling a short, compelling story related to the topic."
        }
        CopywritingFramework::Auto => {
            "Analyze the topic and choose the most effective copywriting framework \
             (like AIDA, PAS, or storytelling) to structure the post."
        }
    }
}

/// System prompt sent with every caption request.
///
/// The length and hashtag hints are instructions to the model only; the
/// returned caption is never checked against them.
pub fn caption_system_prompt(framework: CopywritingFramework) -> String {
    format!(
        "You are a helpful social media assistant. {} Write engaging and friendly content. \
         Include relevant hashtags. The post should be suitable for a general audience \
         and kept concise, under 150 words.",
        framework_instruction(framework)
    )
}

/// User message carrying the post topic.
pub fn caption_user_prompt(topic: &str) -> String {
    format!("The topic is: \"{}\".", topic.trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_framework_has_an_instruction() {
        assert!(framework_instruction(CopywritingFramework::Aida).contains("Attention, Interest, Desire, Action"));
        assert!(framework_instruction(CopywritingFramework::Pas).contains("Problem, Agitate, Solution"));
        assert!(framework_instruction(CopywritingFramework::Storytelling).contains("story"));
        assert!(framework_instruction(CopywritingFramework::Auto).contains("choose the most effective"));
    }

    #[test]
    fn system_prompt_embeds_instruction() {
        let p = caption_system_prompt(CopywritingFramework::Pas);
        assert!(p.starts_with("You are a helpful social media assistant."));
        assert!(p.contains(framework_instruction(CopywritingFramework::Pas)));
        assert!(p.contains("hashtags"));
        assert!(p.contains("under 150 words"));
    }

    #[test]
    fn user_prompt_quotes_trimmed_topic() {
        assert_eq!(
            caption_user_prompt("  Summer sale on sunglasses "),
            "The topic is: \"Summer sale on sunglasses\"."
        );
    }
}
