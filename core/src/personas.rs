//! Static persona registry and the assessment decision table.
//!
//! The set is closed and defined at startup; personas are read-only for the
//! process lifetime. Selection semantics (clearing the chat on a switch) live
//! in [`crate::session`].

use serde::Serialize;

/// A named system-prompt configuration shaping the assistant's tone and role.
#[derive(Debug, Clone, Serialize)]
pub struct Persona {
    pub id: &'static str,
    pub display_name: &'static str,
    pub role_label: &'static str,
    pub description: &'static str,
    #[serde(skip_serializing)]
    pub system_prompt: &'static str,
}

impl Persona {
    /// Opening assistant turn synthesized whenever a conversation (re)starts.
    pub fn greeting(&self) -> String {
        format!(
            "Hello! I'm {}, your {}. How can I support you today?",
            self.display_name, self.role_label
        )
    }

    /// Wrap a raw user message in the persona's role framing for the provider.
    pub fn frame_message(&self, text: &str) -> String {
        format!(
            "As {}, a {}, respond to: {}\n\nRemember: {}",
            self.display_name, self.role_label, text, self.system_prompt
        )
    }
}

pub const DEFAULT_PERSONA_ID: &str = "sage";

pub const PERSONAS: &[Persona] = &[
    Persona {
        id: "sage",
        display_name: "\u{1F9E0} Sage",
        role_label: "Youth Mental Health Counselor",
        description: "For teenagers and young adults (mental health, academics)",
        system_prompt: "You are Sage, a supportive AI counselor for Indian youth aged 13-25. You understand academic pressure, family expectations, and cultural challenges. Always:\n- Provide empathetic, non-judgmental support\n- Recognize signs of serious mental health concerns\n- Offer practical coping strategies rooted in Indian context\n- Bridge communication gaps between youth and families\n- Use encouraging, culturally sensitive language",
    },
    Persona {
        id: "nurture",
        display_name: "\u{1F931} Nurture",
        role_label: "Parenting Guide",
        description: "For parents and guardians (parenting strategies)",
        system_prompt: "You are Nurture, an experienced parenting guide for Indian families. You understand diverse family structures, cultural values, and developmental science. Always:\n- Provide evidence-based parenting strategies\n- Respect cultural traditions while promoting healthy development\n- Adapt advice for different socioeconomic contexts\n- Support parents' mental health and well-being\n- Offer practical, actionable guidance",
    },
    Persona {
        id: "spark",
        display_name: "\u{2728} Spark",
        role_label: "Child Development Specialist",
        description: "For child development activities and learning",
        system_prompt: "You are Spark, a child development specialist creating engaging, age-appropriate activities. You understand Indian cultural contexts and diverse learning needs. Always:\n- Design inclusive activities for all abilities\n- Incorporate cultural elements and local resources\n- Provide clear, step-by-step instructions\n- Suggest modifications for special needs\n- Make learning fun and engaging",
    },
    Persona {
        id: "bridge",
        display_name: "\u{1F309} Bridge",
        role_label: "Family Communication Mediator",
        description: "For family communication and conflict resolution",
        system_prompt: "You are Bridge, a family communication specialist helping resolve conflicts and improve understanding. Always:\n- Remain neutral and understanding\n- Suggest practical communication strategies\n- Help different generations understand each other\n- Provide conflict resolution techniques\n- Support healthy family dynamics",
    },
];

/// Closed-set lookup. Callers validating external input should handle `None`.
pub fn get(id: &str) -> Option<&'static Persona> {
    PERSONAS.iter().find(|p| p.id == id)
}

/// Assessment form answers feeding the recommendation table.
#[derive(Debug, Clone)]
pub struct Assessment<'a> {
    pub age_group: &'a str,
    pub concern: &'a str,
    /// Current mood 1-10. Recorded for diagnostics, never routes the choice.
    pub mood: u8,
}

/// Fixed decision table; rule order matters and the first match wins.
pub fn recommend(assessment: &Assessment) -> &'static Persona {
    let Assessment {
        age_group, concern, ..
    } = assessment;
    let id = if matches!(*age_group, "13-17" | "18-25")
        && matches!(*concern, "Mental health" | "Academic stress")
    {
        "sage"
    } else if *age_group == "Parent/Guardian"
        && matches!(*concern, "Parenting" | "Child development")
    {
        "nurture"
    } else if *concern == "Child development" {
        "spark"
    } else {
        "bridge"
    };
    get(id).expect("recommendation table only names registered personas")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_holds_four_unique_personas() {
        assert_eq!(PERSONAS.len(), 4);
        let mut ids: Vec<_> = PERSONAS.iter().map(|p| p.id).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 4);
        assert!(get(DEFAULT_PERSONA_ID).is_some());
        assert!(get("mystic").is_none());
    }

    #[test]
    fn greeting_names_the_persona() {
        let sage = get("sage").unwrap();
        let greeting = sage.greeting();
        assert!(greeting.contains("Sage"));
        assert!(greeting.contains("Youth Mental Health Counselor"));
    }

    #[test]
    fn frame_message_carries_the_system_prompt() {
        let bridge = get("bridge").unwrap();
        let framed = bridge.frame_message("we keep arguing about curfew");
        assert!(framed.contains("respond to: we keep arguing about curfew"));
        assert!(framed.contains("Remember: You are Bridge"));
    }

    fn pick(age_group: &str, concern: &str) -> &'static str {
        recommend(&Assessment {
            age_group,
            concern,
            mood: 5,
        })
        .id
    }

    #[test]
    fn decision_table_first_match_wins() {
        assert_eq!(pick("13-17", "Mental health"), "sage");
        assert_eq!(pick("18-25", "Academic stress"), "sage");
        assert_eq!(pick("Parent/Guardian", "Parenting"), "nurture");
        // parent + child development hits the nurture rule before spark
        assert_eq!(pick("Parent/Guardian", "Child development"), "nurture");
        assert_eq!(pick("Other", "Child development"), "spark");
        assert_eq!(pick("Other", "Family communication"), "bridge");
        assert_eq!(pick("13-17", "Parenting"), "bridge");
    }
}
