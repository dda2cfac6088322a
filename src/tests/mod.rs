mod classifier_tests;
mod program_tests;
