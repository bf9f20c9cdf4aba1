use anyhow::Result;
use chrono::Utc;
use log::info;

use crate::db::{Database, StoredQuiz};
use crate::models::Question;

pub const DEMO_QUIZ_CODE: &str = "123456";
pub const DEMO_SUBJECT: &str = "Data Structures";

pub fn demo_questions() -> Vec<Question> {
    vec![
        Question::new("What is the time complexity of binary search?", ["O(n)", "O(log n)", "O(n²)", "O(1)"], 1),
        Question::new("Which data structure uses LIFO principle?", ["Queue", "Stack", "Array", "Tree"], 1),
        Question::new("In a doubly linked list, each node has:", ["One pointer", "Two pointers", "Three pointers", "No pointers"], 1),
        Question::new("What does AVL stand for in AVL tree?", ["Advanced Variable Length", "Adelson-Velsky and Landis", "Array Value List", "Auto Variable Link"], 1),
        Question::new("Average case time complexity of hash table lookup:", ["O(n)", "O(log n)", "O(1)", "O(n²)"], 2),
        Question::new("Which sorting algorithm has the best average case?", ["Bubble Sort", "Selection Sort", "Merge Sort", "Insertion Sort"], 2),
        Question::new("Stack overflow occurs when:", ["Memory is full", "Recursion is too deep", "Array index out of bounds", "Null pointer"], 1),
        Question::new("Inorder traversal of BST gives:", ["Random order", "Descending order", "Ascending order", "Level order"], 2),
        Question::new("What is the height of a balanced BST with n nodes?", ["O(n)", "O(log n)", "O(n²)", "O(1)"], 1),
        Question::new("Which is NOT a linear data structure?", ["Array", "Stack", "Queue", "Tree"], 3),
        Question::new("Graph BFS uses which data structure internally?", ["Stack", "Queue", "Tree", "Heap"], 1),
        Question::new("Dijkstra's algorithm finds:", ["Minimum spanning tree", "Shortest path", "Topological sort", "DFS order"], 1),
        Question::new("A complete binary tree with 7 nodes has height:", ["1", "2", "3", "4"], 2),
        Question::new("Which collision resolution uses linked lists?", ["Open addressing", "Linear probing", "Chaining", "Double hashing"], 2),
        Question::new("Heap data structure satisfies:", ["BST property", "Heap property", "AVL property", "B-tree property"], 1),
        Question::new("Postfix notation for A+B*C is:", ["A+BC*", "AB+C*", "ABC*+", "A+B*C"], 2),
        Question::new("Quick sort worst case is:", ["O(n log n)", "O(n)", "O(n²)", "O(log n)"], 2),
        Question::new("DFS uses which data structure?", ["Queue", "Stack", "Heap", "Array"], 1),
        Question::new("Minimum number of nodes in AVL tree of height h:", ["h+1", "2h", "N(h-1)+N(h-2)+1", "2^h"], 2),
        Question::new("Which is an in-place sorting algorithm?", ["Merge Sort", "Quick Sort", "Counting Sort", "Radix Sort"], 1),
    ]
}

/// Inserts the demo quiz unless a quiz already holds its code.
pub async fn seed_demo_quiz(db: &Database) -> Result<bool> {
    if db.quiz_exists(DEMO_QUIZ_CODE).await? {
        return Ok(false);
    }

    db.insert_quiz(&StoredQuiz {
        code: DEMO_QUIZ_CODE.to_string(),
        subject: DEMO_SUBJECT.to_string(),
        section: None,
        questions: demo_questions(),
        created_at: Utc::now(),
    })
    .await?;

    info!("seeded demo quiz {DEMO_QUIZ_CODE}");
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{QuestionSet, QuizCode};
    use crate::scoring::QuizRules;

    #[test]
    fn demo_quiz_fits_default_rules() {
        let rules = QuizRules::default();
        assert!(QuestionSet::new(demo_questions(), rules.question_count).is_ok());
        assert!(QuizCode::parse(DEMO_QUIZ_CODE).is_ok());
    }
}
