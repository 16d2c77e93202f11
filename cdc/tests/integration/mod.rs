mod dead_letter_test;
mod pool_test;
mod replay_test;
