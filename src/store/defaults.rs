//! Built-in content shown when the backend has nothing for a kind.

use crate::models::{
    Certificate, Experience, ExperienceType, Footer, FooterLink, PortfolioContent, Profile,
    Project, SocialLinks,
};

pub fn portfolio() -> PortfolioContent {
    PortfolioContent {
        profile: profile(),
        projects: projects(),
        certificates: certificates(),
        experiences: experiences(),
        footer: footer(),
    }
}

fn profile() -> Profile {
    Profile {
        name: "Aino Lehtonen".to_string(),
        title: "Full-Stack Developer".to_string(),
        bio: "I build fast, accessible web applications and enjoy turning rough ideas \
              into polished products."
            .to_string(),
        location: "Jyvaskyla, Finland".to_string(),
        image: "/images/profile.jpg".to_string(),
        skills: vec![
            "TypeScript".to_string(),
            "React".to_string(),
            "Rust".to_string(),
            "Node.js".to_string(),
            "PostgreSQL".to_string(),
            "Three.js".to_string(),
        ],
        social: SocialLinks {
            github: "https://github.com/ainolehtonen".to_string(),
            linkedin: "https://www.linkedin.com/in/ainolehtonen".to_string(),
            email: "aino.lehtonen@mail.fi".to_string(),
            twitter: None,
            website: None,
        },
    }
}

fn projects() -> Vec<Project> {
    vec![
        Project {
            id: "1".to_string(),
            title: "Portfolio Website".to_string(),
            description: "Personal site with a 3D hero scene and an admin panel.".to_string(),
            long_description: Some(
                "Content is edited in the admin panel and synced to every open session \
                 in real time."
                    .to_string(),
            ),
            images: vec!["/images/projects/portfolio.png".to_string()],
            technologies: vec![
                "React".to_string(),
                "TypeScript".to_string(),
                "Three.js".to_string(),
            ],
            category: "web".to_string(),
            featured: true,
            date: "2024-05".to_string(),
            github_url: Some("https://github.com/ainolehtonen/portfolio".to_string()),
            live_url: None,
        },
        Project {
            id: "2".to_string(),
            title: "Task Tracker".to_string(),
            description: "Kanban board with offline support and sync.".to_string(),
            long_description: None,
            images: vec!["/images/projects/tasks.png".to_string()],
            technologies: vec!["Vue".to_string(), "Node.js".to_string(), "SQLite".to_string()],
            category: "fullstack".to_string(),
            featured: false,
            date: "2023-11".to_string(),
            github_url: Some("https://github.com/ainolehtonen/task-tracker".to_string()),
            live_url: None,
        },
    ]
}

fn certificates() -> Vec<Certificate> {
    vec![Certificate {
        id: "1".to_string(),
        title: "Full Stack Open".to_string(),
        issuer: "University of Helsinki".to_string(),
        date: "2023-06".to_string(),
        image: "/images/certificates/fullstackopen.png".to_string(),
        credential_url: None,
    }]
}

fn experiences() -> Vec<Experience> {
    vec![
        Experience {
            id: "1".to_string(),
            title: "Software Developer".to_string(),
            company: "Keski-Suomen Digitalo".to_string(),
            location: "Jyvaskyla".to_string(),
            start_date: "2023-08".to_string(),
            end_date: None,
            current: true,
            description: vec![
                "Build customer-facing web applications.".to_string(),
                "Maintain CI pipelines and deployment tooling.".to_string(),
            ],
            kind: ExperienceType::Work,
        },
        Experience {
            id: "2".to_string(),
            title: "BSc, Information Technology".to_string(),
            company: "JAMK University of Applied Sciences".to_string(),
            location: "Jyvaskyla".to_string(),
            start_date: "2019-09".to_string(),
            end_date: Some("2023-05".to_string()),
            current: false,
            description: vec!["Major in software engineering.".to_string()],
            kind: ExperienceType::Education,
        },
    ]
}

fn footer() -> Footer {
    Footer {
        text: "Built with care in Finland.".to_string(),
        links: vec![
            FooterLink {
                name: "GitHub".to_string(),
                url: "https://github.com/ainolehtonen".to_string(),
            },
            FooterLink {
                name: "LinkedIn".to_string(),
                url: "https://www.linkedin.com/in/ainolehtonen".to_string(),
            },
        ],
    }
}
