mod owner_tests;
