//! Built-in question bank, used when no bank is configured.

use crate::Question;

fn q(theme: &str, prompt: &str, options: [&str; 4], answer: usize, explanation: &str) -> Question {
    Question {
        theme: theme.to_string(),
        prompt: prompt.to_string(),
        options: options.iter().map(|o| o.to_string()).collect(),
        answer,
        explanation: Some(explanation.to_string()),
    }
}

pub(crate) fn builtin() -> Vec<Question> {
    vec![
        q(
            "music",
            "Which band recorded the album \"Abbey Road\"?",
            ["The Rolling Stones", "The Beatles", "The Who", "Pink Floyd"],
            1,
            "Released in 1969, it was the last album the Beatles recorded together.",
        ),
        q(
            "music",
            "How many lines does a standard music staff have?",
            ["Four", "Six", "Five", "Seven"],
            2,
            "A staff has five lines and four spaces.",
        ),
        q(
            "movies",
            "Who directed \"Jurassic Park\" (1993)?",
            ["Steven Spielberg", "James Cameron", "Ridley Scott", "George Lucas"],
            0,
            "Spielberg adapted Michael Crichton's novel of the same name.",
        ),
        q(
            "movies",
            "Which film features the line \"May the Force be with you\"?",
            ["Star Trek", "Dune", "Blade Runner", "Star Wars"],
            3,
            "The line recurs throughout the Star Wars saga since 1977.",
        ),
        q(
            "history",
            "In which year did the Berlin Wall fall?",
            ["1985", "1989", "1991", "1979"],
            1,
            "The border opened on 9 November 1989.",
        ),
        q(
            "history",
            "Which civilization built Machu Picchu?",
            ["Aztec", "Maya", "Inca", "Olmec"],
            2,
            "The Inca built it in the 15th century in the Peruvian Andes.",
        ),
        q(
            "science",
            "What is the chemical symbol for gold?",
            ["Au", "Ag", "Gd", "Go"],
            0,
            "From the Latin \"aurum\".",
        ),
        q(
            "science",
            "Which planet is closest to the Sun?",
            ["Venus", "Mars", "Earth", "Mercury"],
            3,
            "Mercury orbits at about 0.39 astronomical units.",
        ),
        q(
            "sports",
            "How many players does a football (soccer) team field?",
            ["Ten", "Eleven", "Nine", "Twelve"],
            1,
            "Ten outfield players plus a goalkeeper.",
        ),
        q(
            "sports",
            "In which sport is the term \"love\" used for a score of zero?",
            ["Tennis", "Golf", "Cricket", "Badminton"],
            0,
            "Tennis scoring runs love, 15, 30, 40.",
        ),
        q(
            "geography",
            "What is the capital of Australia?",
            ["Sydney", "Melbourne", "Canberra", "Perth"],
            2,
            "Canberra was purpose-built as a compromise between Sydney and Melbourne.",
        ),
        q(
            "geography",
            "Which is the longest river in South America?",
            ["Paraná", "Orinoco", "São Francisco", "Amazon"],
            3,
            "The Amazon also carries more water than any other river.",
        ),
    ]
}
