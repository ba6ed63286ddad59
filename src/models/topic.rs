//! Forum topics

/// A forum topic. The set is fixed at build time.
#[derive(Debug, PartialEq, Eq)]
pub struct Topic {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub icon: &'static str,
}

pub static TOPICS: [Topic; 5] = [
    Topic {
        id: "general",
        name: "General Discussion",
        description: "Chat about anything and everything",
        icon: "\u{1F4AC}",
    },
    Topic {
        id: "games",
        name: "Gaming",
        description: "Discuss your favorite games and gaming news",
        icon: "\u{1F3AE}",
    },
    Topic {
        id: "movies",
        name: "Movies & TV",
        description: "Talk about the latest films and shows",
        icon: "\u{1F3AC}",
    },
    Topic {
        id: "sports",
        name: "Sports",
        description: "Discuss sports events and teams",
        icon: "\u{26BD}",
    },
    Topic {
        id: "technology",
        name: "Technology",
        description: "Chat about tech news and gadgets",
        icon: "\u{1F4BB}",
    },
];

impl Topic {
    pub fn all() -> &'static [Topic] {
        &TOPICS
    }

    pub fn find(id: &str) -> Option<&'static Topic> {
        TOPICS.iter().find(|t| t.id == id)
    }

    /// Local storage key holding this topic's serialized message list.
    pub fn storage_key(&self) -> String {
        format!("forum-{}-messages", self.id)
    }

    /// Object storage prefix for attachments posted in this topic.
    pub fn upload_scope(&self) -> String {
        format!("forums/{}", self.id)
    }
}
